use crate::errors::CoreError;

/// Loading/error status of one dashboard section plus its last good data.
///
/// A failed refresh records the error but keeps the previous data, so the
/// UI can keep showing it next to the message.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> LoadState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a refresh as started. Clears the previous error.
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn succeed(&mut self, data: T) {
        self.data = Some(data);
        self.loading = false;
        self.error = None;
    }

    pub fn fail(&mut self, error: &CoreError) {
        self.loading = false;
        self.error = Some(error.to_string());
    }

    pub fn is_ready(&self) -> bool {
        self.data.is_some()
    }
}
