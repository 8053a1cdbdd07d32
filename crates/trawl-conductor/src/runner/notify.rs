/// User-facing notification sink for session events.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, message: &str);
}

/// Prints to stdout.
pub struct StdoutNotifier;

#[async_trait::async_trait]
impl Notifier for StdoutNotifier {
    async fn notify(&self, title: &str, message: &str) {
        println!("[trawl] {title}: {message}");
    }
}

/// Collects notifications in memory (for testing).
#[derive(Default)]
pub struct CollectNotifier {
    messages: std::sync::Mutex<Vec<(String, String)>>,
}

impl CollectNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn titles(&self) -> Vec<String> {
        self.messages().into_iter().map(|(t, _)| t).collect()
    }

    pub fn count(&self, title: &str) -> usize {
        self.messages().iter().filter(|(t, _)| t == title).count()
    }
}

#[async_trait::async_trait]
impl Notifier for CollectNotifier {
    async fn notify(&self, title: &str, message: &str) {
        if let Ok(mut m) = self.messages.lock() {
            m.push((title.to_string(), message.to_string()));
        }
    }
}
