//! Desktop surface: a native application window observed through xcap and
//! driven with synthesized input. There is no DOM here - elements are
//! reached by keyboard affordances, window-relative coordinates, and the
//! clipboard.

pub mod capture;
pub mod input;
pub mod window;

pub use capture::{ScreenCapture, TesseractCli, TextRecognizer};
pub use input::Input;
pub use window::{acquire, find_window, find_window_title, is_process_running, LaunchSpec, WindowInfo};
