pub mod button;
pub mod counter;
pub mod descriptor;
pub mod manager;

pub use button::TaskButton;
pub use counter::TaskCounter;
pub use descriptor::{build_descriptor, CommandDescriptor};
pub use manager::{LifecycleState, TaskButtons};
