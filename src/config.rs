use std::thread;

const DEFAULT_THREAD_NAME: &str = "cpf";

/// Thread settings shared by every launcher and merger a runner starts.
///
/// ```
/// use cpf::config::Config;
///
/// let config = Config::new().thread_name("resolver").stack_size(256 * 1024);
/// assert_eq!(config.thread_name_prefix(), "resolver");
/// ```
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    thread_name: String,
    stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            stack_size: None,
        }
    }
}

impl Config {
    /// Default configuration: thread prefix `cpf`, platform stack size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix of spawned thread names (`{prefix}-task-{index}`,
    /// `{prefix}-merge`).
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Stack size in bytes of every spawned thread.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    #[must_use]
    pub fn thread_name_prefix(&self) -> &str {
        &self.thread_name
    }

    pub(crate) fn task_thread_name(&self, index: usize) -> String {
        format!("{}-task-{index}", self.thread_name)
    }

    pub(crate) fn merge_thread_name(&self) -> String {
        format!("{}-merge", self.thread_name)
    }

    pub(crate) fn builder(&self, name: String) -> thread::Builder {
        let builder = thread::Builder::new().name(name);
        match self.stack_size {
            Some(bytes) => builder.stack_size(bytes),
            None => builder,
        }
    }
}
