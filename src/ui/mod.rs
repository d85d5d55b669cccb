pub mod chart;
pub mod layout;
pub mod statusbar;
pub mod toggles;

pub use chart::{ChartGeometry, PriceChart, VolumeChart};
pub use layout::{Hit, LayoutManager};
pub use statusbar::StatusBar;
pub use toggles::{Overlay, OverlayControls};
