//! X-Plane 12 integration.
//!
//! The simulator's local web API (`http://{host}:{port}/api/v2`) serves as
//! the variable backend for both the aircraft and the ground-ops add-on, and
//! as the probe for every connection step.
//!
//! ```text
//! GET   /api/capabilities                       transport check
//! GET   /api/v2/datarefs?filter[name]=NAME      name -> id (cached)
//! GET   /api/v2/datarefs/{id}/value[?index=n]   read
//! PATCH /api/v2/datarefs/{id}/value[?index=n]   write {"data": value}
//! ```

mod install;
mod webapi;

pub use install::{
    default_menu_file, detect_xplane_install, install_reference_path, installs_from_reference,
    menu_file_for, InstallError, MENU_FILE_RELATIVE,
};
pub use webapi::{
    split_index, WebApiClient, WebApiConfig, DEFAULT_AIRCRAFT_PROBE, DEFAULT_SESSION_READY,
    DEFAULT_WEB_API_PORT,
};
