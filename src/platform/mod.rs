//! Platform-specific helpers.
//! Hides OS differences behind a uniform API so the engine and the app can stay
//! platform-agnostic. Redirection relies on symlinks, so Unix is the primary target.

mod temp;
#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::{
    create_symlink, open_log_file_secure_append, set_dir_mode_0700, write_config_secure_new_0600,
};

#[cfg(windows)]
pub use windows::{
    create_symlink, open_log_file_secure_append, set_dir_mode_0700, write_config_secure_new_0600,
};
