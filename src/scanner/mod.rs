pub mod detector;
pub mod orchestrator;
pub mod signal;
pub mod swing;
pub mod universe;

pub use detector::SignalDetector;
pub use orchestrator::Scanner;
pub use signal::Signal;
pub use swing::SwingLevelSet;
pub use universe::UniverseTracker;
