pub mod controller;
pub mod export;
pub mod hardware;
pub mod http;
pub mod playback;
pub mod plot;
pub mod settings;
pub mod synth;

pub use controller::*;
pub use export::*;
pub use hardware::*;
pub use playback::*;
pub use plot::*;
pub use settings::*;
pub use synth::*;
