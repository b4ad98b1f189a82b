//! Bridges `notify` file system events into the watch engine's queue.

use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};
use tsgen_codegen::{ChangeEvent, ChangeQueue};

/// Start watching `paths`. Events flow into `queue` until the returned
/// watcher is dropped.
pub fn start(
    queue: ChangeQueue,
    paths: &[(PathBuf, RecursiveMode)],
) -> notify::Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for change in changes(&event) {
                if !queue.push(change) {
                    debug!("engine not accepting changes, event dropped");
                }
            }
        }
        Err(err) => warn!(%err, "file watch error"),
    })?;
    for (path, mode) in paths {
        watcher.watch(path, *mode)?;
    }
    Ok(watcher)
}

/// Map one `notify` event to engine change events.
pub fn changes(event: &Event) -> Vec<ChangeEvent> {
    let paths = event.paths.iter();
    match event.kind {
        EventKind::Create(_) => paths.map(ChangeEvent::created).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] => vec![ChangeEvent::renamed(from, to)],
            _ => paths.map(ChangeEvent::changed).collect(),
        },
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.map(ChangeEvent::deleted).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.map(ChangeEvent::created).collect()
        }
        EventKind::Modify(_) => paths.map(ChangeEvent::changed).collect(),
        EventKind::Remove(_) => paths.map(ChangeEvent::deleted).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, path| event.add_path(PathBuf::from(path)))
    }

    #[test]
    fn test_content_events() {
        assert_eq!(
            changes(&event(EventKind::Create(CreateKind::File), &["/src/a.rs"])),
            vec![ChangeEvent::created("/src/a.rs")]
        );
        assert_eq!(
            changes(&event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/src/a.rs"]
            )),
            vec![ChangeEvent::changed("/src/a.rs")]
        );
        assert_eq!(
            changes(&event(EventKind::Remove(RemoveKind::File), &["/src/a.rs"])),
            vec![ChangeEvent::deleted("/src/a.rs")]
        );
    }

    #[test]
    fn test_renames() {
        assert_eq!(
            changes(&event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/src/old.rs", "/src/new.rs"]
            )),
            vec![ChangeEvent::renamed("/src/old.rs", "/src/new.rs")]
        );
        assert_eq!(
            changes(&event(
                EventKind::Modify(ModifyKind::Name(RenameMode::From)),
                &["/src/old.rs"]
            )),
            vec![ChangeEvent::deleted("/src/old.rs")]
        );
        assert_eq!(
            changes(&event(
                EventKind::Modify(ModifyKind::Name(RenameMode::To)),
                &["/src/new.rs"]
            )),
            vec![ChangeEvent::created("/src/new.rs")]
        );
    }

    #[test]
    fn test_metadata_change() {
        assert_eq!(
            changes(&event(
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)),
                &["/src/a.rs"]
            )),
            vec![ChangeEvent::changed("/src/a.rs")]
        );
    }

    #[test]
    fn test_ignored_events() {
        assert!(changes(&event(EventKind::Access(AccessKind::Any), &["/src/a.rs"])).is_empty());
        assert!(changes(&event(EventKind::Other, &["/src/a.rs"])).is_empty());
    }
}
