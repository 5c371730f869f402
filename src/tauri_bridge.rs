use crate::channel::{Handler, ListenerId, PushChannel};
use tauri::{AppHandle, Listener, Runtime};

/// Lets the progress subscription consume events the Tauri backend emits
/// with `app.emit("install-progress", ..)`.
impl<R: Runtime> PushChannel for AppHandle<R> {
    fn listen(&self, event: &str, handler: Handler) -> ListenerId {
        let id = Listener::listen(self, event.to_string(), move |event: tauri::Event| {
            handler(event.payload())
        });
        ListenerId(u64::from(id))
    }

    fn unlisten(&self, id: ListenerId) {
        match u32::try_from(id.0) {
            Ok(id) => Listener::unlisten(self, id),
            Err(_) => tracing::warn!("listener id {} was not issued by tauri", id.0),
        }
    }
}
