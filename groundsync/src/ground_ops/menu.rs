//! Adapter for the ground-ops modal menu.
//!
//! The backend exposes a single-slot command protocol: a trigger that opens
//! the menu, a ready flag, and a choice variable taking a zero-based line
//! index. Operator prompts ("Select handling operator") are not exposed as
//! variables; they are detected from the first line of a text file the
//! backend writes next to the simulator.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::keys::GroundOpsKeys;
use crate::variables::{BackendError, ObserverError, SharedBackend, VarValue, VariableObserver};

/// Default time to wait for the menu ready flag.
pub const DEFAULT_MENU_READY_TIMEOUT: Duration = Duration::from_millis(2000);

/// Default settle time before checking for an operator prompt.
pub const DEFAULT_OPERATOR_SETTLE: Duration = Duration::from_millis(1000);

/// Default extra wait when the first operator check is inconclusive.
pub const DEFAULT_OPERATOR_EXTRA_DELAY: Duration = Duration::from_millis(1500);

/// Interval between checks of the cached ready flag.
const READY_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Errors raised while driving the menu.
#[derive(Debug, Error)]
pub enum MenuError {
    /// Menu lines are numbered from 1.
    #[error("Invalid menu index {0}, lines are numbered from 1")]
    InvalidIndex(u32),

    #[error("Menu write failed: {0}")]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Observer(#[from] ObserverError),
}

/// Top-level menu lines used by the automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuCommand {
    Deboarding,
    Catering,
    Refueling,
    Boarding,
    Pushback,
    Jetway,
    Stairs,
}

impl MenuCommand {
    /// One-based line number in the main menu.
    pub fn index(&self) -> u32 {
        match self {
            MenuCommand::Deboarding => 1,
            MenuCommand::Catering => 2,
            MenuCommand::Refueling => 3,
            MenuCommand::Boarding => 4,
            MenuCommand::Pushback => 5,
            MenuCommand::Jetway => 6,
            MenuCommand::Stairs => 7,
        }
    }
}

impl fmt::Display for MenuCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MenuCommand::Deboarding => "deboarding",
            MenuCommand::Catering => "catering",
            MenuCommand::Refueling => "refueling",
            MenuCommand::Boarding => "boarding",
            MenuCommand::Pushback => "pushback",
            MenuCommand::Jetway => "jetway",
            MenuCommand::Stairs => "stairs",
        };
        write!(f, "{}", s)
    }
}

/// Whether an operator selection prompt is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorSelection {
    /// The menu file is missing, unreadable or empty.
    Unknown,
    /// An operator prompt is showing.
    Yes,
    /// The menu shows something else.
    No,
}

fn operator_prompt_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^Select (handling|catering) operator").expect("valid operator regex")
    })
}

/// Classify the contents of the menu file.
pub fn parse_operator_prompt(contents: &str) -> OperatorSelection {
    let first = contents
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty());

    match first {
        None => OperatorSelection::Unknown,
        Some(line) if operator_prompt_pattern().is_match(line) => OperatorSelection::Yes,
        Some(_) => OperatorSelection::No,
    }
}

/// Read and classify the menu file. I/O errors yield `Unknown`.
pub async fn read_operator_selection(path: &Path) -> OperatorSelection {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => parse_operator_prompt(&contents),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Menu file not readable");
            OperatorSelection::Unknown
        }
    }
}

/// Menu adapter settings.
#[derive(Debug, Clone)]
pub struct MenuConfig {
    /// Side-channel file holding the current menu text.
    pub menu_file: PathBuf,
    pub ready_timeout: Duration,
    pub operator_settle: Duration,
    pub operator_extra_delay: Duration,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            menu_file: PathBuf::new(),
            ready_timeout: DEFAULT_MENU_READY_TIMEOUT,
            operator_settle: DEFAULT_OPERATOR_SETTLE,
            operator_extra_delay: DEFAULT_OPERATOR_EXTRA_DELAY,
        }
    }
}

/// Drives the ground-ops menu through backend variables.
#[derive(Clone)]
pub struct MenuAdapter {
    backend: SharedBackend,
    observer: VariableObserver,
    keys: GroundOpsKeys,
    config: MenuConfig,
}

impl MenuAdapter {
    pub fn new(
        backend: SharedBackend,
        observer: VariableObserver,
        keys: GroundOpsKeys,
        config: MenuConfig,
    ) -> Self {
        Self {
            backend,
            observer,
            keys,
            config,
        }
    }

    pub fn config(&self) -> &MenuConfig {
        &self.config
    }

    /// Start monitoring the ready flag so waits can use the cached value.
    pub async fn attach(&self) -> Result<(), MenuError> {
        self.observer
            .subscribe(self.keys.menu_ready.clone(), |_| {})
            .await?;
        Ok(())
    }

    /// Pull the menu-open trigger.
    pub async fn open_menu(&self) -> Result<(), MenuError> {
        debug!("Opening ground-ops menu");
        self.backend
            .write(&self.keys.menu_open, VarValue::Number(1.0))
            .await?;
        Ok(())
    }

    /// Select a one-based menu line.
    pub async fn select_item(&self, index: u32, wait_for_ready: bool) -> Result<(), MenuError> {
        if index == 0 {
            return Err(MenuError::InvalidIndex(index));
        }

        if wait_for_ready && !self.wait_for_menu_ready(self.config.ready_timeout).await? {
            warn!(index, "Menu not ready before timeout, selecting anyway");
        }

        debug!(index, "Selecting menu item");
        self.backend
            .write(&self.keys.menu_choice, VarValue::Number(f64::from(index - 1)))
            .await?;
        Ok(())
    }

    /// Wait until the cached ready flag is true. Returns false on timeout.
    pub async fn wait_for_menu_ready(&self, timeout: Duration) -> Result<bool, MenuError> {
        let deadline = Instant::now() + timeout;
        loop {
            let ready = self
                .observer
                .current(&self.keys.menu_ready)
                .await?
                .map(|v| v.as_bool())
                .unwrap_or(false);
            if ready {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(READY_CHECK_INTERVAL).await;
        }
    }

    /// Check the menu file for an operator prompt.
    pub async fn operator_selection(&self) -> OperatorSelection {
        read_operator_selection(&self.config.menu_file).await
    }

    /// Settle, look for an operator prompt and accept the first operator.
    pub async fn handle_operator_selection(
        &self,
        extra_delay: Duration,
    ) -> Result<OperatorSelection, MenuError> {
        sleep(self.config.operator_settle).await;
        let mut selection = self.operator_selection().await;

        if selection == OperatorSelection::Unknown {
            sleep(extra_delay).await;
            selection = self.operator_selection().await;
        }

        if selection == OperatorSelection::Yes {
            info!("Operator prompt showing, choosing the first operator");
            self.select_item(1, true).await?;
        }
        Ok(selection)
    }

    /// Open the menu, pick a top-level line and answer any operator prompt.
    pub async fn call(&self, command: MenuCommand) -> Result<OperatorSelection, MenuError> {
        info!(command = %command, "Calling ground service");
        self.open_menu().await?;
        self.select_item(command.index(), true).await?;
        self.handle_operator_selection(self.config.operator_extra_delay)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::variables::{MemoryBackend, ObserverConfig};
    use std::io::Write;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_parse_operator_prompts() {
        assert_eq!(
            parse_operator_prompt("Select handling operator\n1. Foo"),
            OperatorSelection::Yes
        );
        assert_eq!(
            parse_operator_prompt("\n\n  Select catering operator  \n"),
            OperatorSelection::Yes
        );
        assert_eq!(
            parse_operator_prompt("Request boarding\n"),
            OperatorSelection::No
        );
        assert_eq!(parse_operator_prompt("  \n\n"), OperatorSelection::Unknown);
    }

    #[tokio::test]
    async fn test_missing_file_is_unknown() {
        let path = Path::new("/nonexistent/groundsync/menu");
        assert_eq!(read_operator_selection(path).await, OperatorSelection::Unknown);
    }

    fn adapter(backend: Arc<MemoryBackend>, menu_file: PathBuf) -> (MenuAdapter, CancellationToken) {
        let cancel = CancellationToken::new();
        let (observer, _) = VariableObserver::start(
            backend.clone(),
            EventBus::new(),
            ObserverConfig {
                poll_interval: Duration::from_millis(10),
            },
            cancel.clone(),
        );
        let config = MenuConfig {
            menu_file,
            ready_timeout: Duration::from_millis(200),
            operator_settle: Duration::from_millis(1),
            operator_extra_delay: Duration::from_millis(1),
        };
        (
            MenuAdapter::new(backend, observer, GroundOpsKeys::default(), config),
            cancel,
        )
    }

    #[tokio::test]
    async fn test_select_item_writes_zero_based_index() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set("FSDT_GSX_MENU_READY", true);
        let (menu, cancel) = adapter(backend.clone(), PathBuf::new());
        menu.attach().await.unwrap();

        menu.select_item(4, true).await.unwrap();

        assert_eq!(
            backend.writes_to("FSDT_GSX_MENU_CHOICE"),
            vec![VarValue::Number(3.0)]
        );
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_select_item_zero_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        let (menu, cancel) = adapter(backend.clone(), PathBuf::new());

        let result = menu.select_item(0, false).await;

        assert!(matches!(result, Err(MenuError::InvalidIndex(0))));
        assert!(backend.writes().is_empty());
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_wait_uses_cached_flag_not_fresh_read() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set("FSDT_GSX_MENU_READY", true);
        let (menu, cancel) = adapter(backend.clone(), PathBuf::new());

        // not monitored yet, so there is no cached value to see
        let ready = menu
            .wait_for_menu_ready(Duration::from_millis(30))
            .await
            .unwrap();
        assert!(!ready);
        assert_eq!(backend.read_count("FSDT_GSX_MENU_READY"), 0);

        menu.attach().await.unwrap();
        let ready = menu
            .wait_for_menu_ready(Duration::from_millis(500))
            .await
            .unwrap();
        assert!(ready);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_operator_prompt_selects_first_option() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set("FSDT_GSX_MENU_READY", true);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Select handling operator").unwrap();
        let (menu, cancel) = adapter(backend.clone(), file.path().to_path_buf());
        menu.attach().await.unwrap();

        let selection = menu
            .handle_operator_selection(Duration::from_millis(1))
            .await
            .unwrap();

        assert_eq!(selection, OperatorSelection::Yes);
        assert_eq!(
            backend.writes_to("FSDT_GSX_MENU_CHOICE"),
            vec![VarValue::Number(0.0)]
        );
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_call_opens_and_selects() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set("FSDT_GSX_MENU_READY", true);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Ground services").unwrap();
        let (menu, cancel) = adapter(backend.clone(), file.path().to_path_buf());
        menu.attach().await.unwrap();

        let selection = menu.call(MenuCommand::Refueling).await.unwrap();

        assert_eq!(selection, OperatorSelection::No);
        assert_eq!(
            backend.writes_to("FSDT_GSX_MENU_OPEN"),
            vec![VarValue::Number(1.0)]
        );
        assert_eq!(
            backend.writes_to("FSDT_GSX_MENU_CHOICE"),
            vec![VarValue::Number(2.0)]
        );
        cancel.cancel();
    }
}
