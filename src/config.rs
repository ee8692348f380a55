/// Settings for a [`TransferHub`](crate::TransferHub) using the [`Os`](crate::Os) selector.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Initial size of the readiness event buffer. It grows when a round
    /// watches more descriptors than this.
    pub event_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            event_capacity: 128,
        }
    }
}

impl HubConfig {
    pub fn event_capacity(mut self, event_capacity: usize) -> Self {
        self.event_capacity = event_capacity;
        self
    }
}
