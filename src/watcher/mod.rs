use inotify::{EventMask, Inotify, WatchMask};
use tokio::sync::mpsc::Sender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Create { name: String, base_path: String },
    Delete { name: String, base_path: String },
}

/// Watch for files being created and deleted in the given directory, sending
/// [WatchEvent]s to the given channel. Blocks the calling thread and returns
/// once the receiving end of the channel is gone.
pub fn watch(path: String, tx: Sender<WatchEvent>) {
    let mut inotify = match Inotify::init() {
        Ok(inotify) => inotify,
        Err(e) => {
            log::error!("Failed to initialize inotify: {e:?}");
            return;
        }
    };

    if let Err(e) = inotify
        .watches()
        .add(path.clone(), WatchMask::CREATE | WatchMask::DELETE)
    {
        log::error!("Unable to add inotify watcher for path: {path}. Got error {e:?}");
        return;
    }

    let mut buffer = [0u8; 4096];
    loop {
        let events = match inotify.read_events_blocking(&mut buffer) {
            Ok(events) => events,
            Err(e) => {
                log::error!("Failed to read inotify events for {path}: {e:?}");
                return;
            }
        };

        for event in events {
            let Some(name) = event.name.and_then(|name| name.to_str()) else {
                continue;
            };
            let name = name.to_string();

            let value = if event.mask.contains(EventMask::CREATE) {
                log::debug!("inotify CREATE: {name}");
                WatchEvent::Create {
                    name,
                    base_path: path.clone(),
                }
            } else if event.mask.contains(EventMask::DELETE) {
                log::debug!("inotify DELETE: {name}");
                WatchEvent::Delete {
                    name,
                    base_path: path.clone(),
                }
            } else {
                continue;
            };

            if tx.blocking_send(value).is_err() {
                log::debug!("Stopped watching {path}");
                return;
            }
        }
    }
}
