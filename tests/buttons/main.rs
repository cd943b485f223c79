mod manager;

use serde_json::Value;
use std::sync::Arc;
use task_buttons::buttons::TaskButtons;
use task_buttons::config::ButtonsConfig;
use task_buttons::host::memory::MemoryHost;
use task_buttons::host::Host;

pub fn manager(host: &MemoryHost, tasks: Vec<Value>, show_counter: bool) -> TaskButtons {
    let host: Arc<dyn Host> = Arc::new(host.clone());
    TaskButtons::new(host, ButtonsConfig::new(tasks, show_counter))
}
