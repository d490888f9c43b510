mod color;
mod events;
mod reconcile;
mod scan;

pub use color::{join, set_color, status};
pub use events::{import_events, list_events, purge_events};
pub use reconcile::reconcile;
pub use scan::scan;
