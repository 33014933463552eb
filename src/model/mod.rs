mod graph;
mod highlight;
mod load;

pub use graph::{Flow, GraphDataset, GraphLink, GraphNode};
pub use highlight::HighlightState;
pub use load::{load_dataset, load_highlight};
