//! File watcher that requests a catalog reload when the template changes.

use std::path::{Path, PathBuf};

use crossbeam_channel::{unbounded, Receiver, TryRecvError};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Watches one template file. Reload requests arrive on [`receiver`].
///
/// The parent directory is watched rather than the file so editors that
/// replace the file on save are still picked up.
///
/// [`receiver`]: TemplateWatcher::receiver
pub struct TemplateWatcher {
    path: PathBuf,
    receiver: Receiver<PathBuf>,
    _watcher: RecommendedWatcher,
}

impl TemplateWatcher {
    pub fn watch(path: impl Into<PathBuf>) -> notify::Result<Self> {
        let path = path.into();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let (sender, receiver) = unbounded::<PathBuf>();
        let target = path.clone();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) if is_relevant(&event, &target) => {
                    let _ = sender.send(target.clone());
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(
                    target: "damage_zones::watcher",
                    error = %err,
                    "template.watch_error"
                ),
            }
        })?;
        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(
            target: "damage_zones::watcher",
            path = %path.display(),
            "template.watching"
        );
        Ok(Self {
            path,
            receiver,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn receiver(&self) -> &Receiver<PathBuf> {
        &self.receiver
    }

    /// Pending reload request, collapsing bursts into one.
    pub fn try_next(&self) -> Option<PathBuf> {
        let mut latest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(path) => latest = Some(path),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return latest,
            }
        }
    }
}

fn is_relevant(event: &Event, target: &Path) -> bool {
    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
        return false;
    }
    let Some(name) = target.file_name() else {
        return false;
    };
    event
        .paths
        .iter()
        .any(|path| path.file_name() == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn only_writes_to_the_template_are_relevant() {
        let target = Path::new("assets/damage_zones.svg");
        let modify = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/abs/assets/damage_zones.svg"));
        assert!(is_relevant(&modify, target));

        let create = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("assets/damage_zones.svg"));
        assert!(is_relevant(&create, target));

        let other_file = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("assets/other.svg"));
        assert!(!is_relevant(&other_file, target));

        let removed = Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("assets/damage_zones.svg"));
        assert!(!is_relevant(&removed, target));
    }
}
