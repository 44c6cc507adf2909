//! Transfer progress reporting
//!
//! Progress is pushed to a plain callback `(transferred_bytes, total_bytes)`
//! after every chunk; nothing is retained between events.

use std::io::Write;

/// Callback receiving `(transferred_bytes, total_bytes)`
pub type ProgressCallback<'a> = &'a mut (dyn FnMut(u64, u64) + Send);

/// One progress notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub transferred_bytes: u64,
    pub total_bytes: u64,
}

impl ProgressEvent {
    pub fn new(transferred_bytes: u64, total_bytes: u64) -> Self {
        Self {
            transferred_bytes,
            total_bytes,
        }
    }

    /// Completion percentage (0-100). An empty file counts as complete.
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.transferred_bytes as f64 / self.total_bytes as f64) * 100.0
    }

    /// `transferred/total bytes (pp.p%)`
    pub fn render(&self) -> String {
        format!(
            "{}/{} bytes ({:.1}%)",
            self.transferred_bytes,
            self.total_bytes,
            self.percent()
        )
    }
}

/// Default callback: one console line, rewritten in place
pub fn console_progress(transferred_bytes: u64, total_bytes: u64) {
    let event = ProgressEvent::new(transferred_bytes, total_bytes);
    let mut stdout = std::io::stdout().lock();
    let _ = write!(stdout, "\rProgress: {}", event.render());
    if transferred_bytes >= total_bytes {
        let _ = writeln!(stdout);
    }
    let _ = stdout.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(ProgressEvent::new(500, 1000).render(), "500/1000 bytes (50.0%)");
        assert_eq!(ProgressEvent::new(1, 3).render(), "1/3 bytes (33.3%)");
        assert_eq!(ProgressEvent::new(0, 0).render(), "0/0 bytes (100.0%)");
    }
}
