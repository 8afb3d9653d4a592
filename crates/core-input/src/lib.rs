//! Async input service helpers shared across the runtime.

mod async_service;
pub use async_service::AsyncInputShutdown;

use async_service::spawn_async_event_task;

use core_events::{
    Event, InputEvent, KeyCode, KeyEvent, KeyModifiers, KeyToken, ModMask, NamedKey,
    normalize_keycode,
};
use crossterm::event::KeyModifiers as CMods;
use tokio::task::JoinHandle;

#[inline]
pub(crate) fn log_paste_chunk_flush(chunk: &str) {
    tracing::trace!(target: "input.paste", chunk_len = chunk.len(), "chunk_flush");
}

#[inline]
pub(crate) fn build_key_event(code: KeyCode, mods: KeyModifiers) -> Event {
    Event::Input(InputEvent::Key(KeyEvent {
        code: normalize_keycode(code),
        mods,
    }))
}

/// Collapse a NGI `KeyToken` (as produced by the live input task's
/// `KeyPress` events) down to the legacy `KeyEvent` shape `core-keymap`
/// resolves against. Tokens with no legacy counterpart (navigation keys
/// beyond the arrows, function keys, raw `Chord` bases we don't map) yield
/// `None` and the keystroke is dropped upstream.
pub fn key_token_to_key_event(token: &KeyToken) -> Option<KeyEvent> {
    fn base_code(token: &KeyToken) -> Option<KeyCode> {
        match token {
            KeyToken::Char(c) => Some(KeyCode::Char(*c)),
            KeyToken::Named(NamedKey::Enter) => Some(KeyCode::Enter),
            KeyToken::Named(NamedKey::Esc) => Some(KeyCode::Esc),
            KeyToken::Named(NamedKey::Backspace) => Some(KeyCode::Backspace),
            KeyToken::Named(NamedKey::Tab) => Some(KeyCode::Tab),
            KeyToken::Named(NamedKey::Up) => Some(KeyCode::Up),
            KeyToken::Named(NamedKey::Down) => Some(KeyCode::Down),
            KeyToken::Named(NamedKey::Left) => Some(KeyCode::Left),
            KeyToken::Named(NamedKey::Right) => Some(KeyCode::Right),
            KeyToken::Named(_) => None,
            KeyToken::Chord { .. } => None,
        }
    }

    match token {
        KeyToken::Chord { base, mods } => {
            let code = base_code(base)?;
            let mut out = KeyModifiers::empty();
            if mods.contains(ModMask::CTRL) {
                out |= KeyModifiers::CTRL;
            }
            if mods.contains(ModMask::ALT) {
                out |= KeyModifiers::ALT;
            }
            if mods.contains(ModMask::SHIFT) {
                out |= KeyModifiers::SHIFT;
            }
            Some(KeyEvent {
                code: normalize_keycode(code),
                mods: out,
            })
        }
        other => base_code(other).map(|code| KeyEvent {
            code: normalize_keycode(code),
            mods: KeyModifiers::empty(),
        }),
    }
}

/// Spawn the async input service backed by `crossterm::EventStream`.
///
/// Returns the `JoinHandle` for the background task alongside a shutdown handle
/// that can be used to request immediate termination.
pub fn spawn_async_input(
    sender: tokio::sync::mpsc::Sender<Event>,
) -> (JoinHandle<()>, AsyncInputShutdown) {
    spawn_async_event_task(sender)
}

pub(crate) fn map_mods(m: CMods) -> KeyModifiers {
    let mut out = KeyModifiers::empty();
    if m.contains(CMods::CONTROL) {
        out |= KeyModifiers::CTRL;
    }
    if m.contains(CMods::ALT) {
        out |= KeyModifiers::ALT;
    }
    if m.contains(CMods::SHIFT) {
        out |= KeyModifiers::SHIFT;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::key_token_to_key_event;
    use core_events::{KeyCode, KeyModifiers, KeyToken, ModMask, NamedKey};

    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tracing::Subscriber;
    use tracing::dispatcher::Dispatch;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::Context;
    use tracing_subscriber::layer::Layer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::registry::Registry;

    #[derive(Clone, Default)]
    struct Capture {
        events: Arc<Mutex<Vec<CapturedEvent>>>,
    }

    #[derive(Clone, Debug)]
    struct CapturedEvent {
        target: String,
        fields: Vec<(String, String)>,
    }

    #[derive(Default)]
    struct FieldCollector {
        fields: Vec<(String, String)>,
    }

    impl Visit for FieldCollector {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }

    impl<S> Layer<S> for Capture
    where
        S: Subscriber,
    {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut collector = FieldCollector::default();
            event.record(&mut collector);
            let meta = event.metadata();
            self.events.lock().unwrap().push(CapturedEvent {
                target: meta.target().to_string(),
                fields: collector.fields,
            });
        }
    }

    #[test]
    fn chunk_flush_log_redacts_content() {
        let capture = Capture::default();
        let events = capture.events.clone();
        let subscriber = Registry::default().with(capture);
        let dispatch = Dispatch::new(subscriber);

        tracing::dispatcher::with_default(&dispatch, || {
            let secret = "secret paste payload 💣";
            super::log_paste_chunk_flush(secret);
        });

        let events = events.lock().unwrap();
        assert!(
            !events.is_empty(),
            "expected at least one captured input.paste event"
        );
        let event = events
            .iter()
            .find(|e| e.target == "input.paste")
            .expect("missing input.paste event");
        assert!(
            event.fields.iter().any(|(name, _)| name == "chunk_len"),
            "chunk_len field missing from event"
        );
        for (_, value) in &event.fields {
            assert!(
                !value.contains("secret paste payload"),
                "event leaked raw paste content: {value}"
            );
            assert!(
                !value.contains("💣"),
                "event leaked emoji from paste content: {value}"
            );
        }
    }

    #[test]
    fn plain_char_token_maps_to_key_event() {
        let ev = key_token_to_key_event(&KeyToken::Char('x')).expect("char maps");
        assert_eq!(ev.code, KeyCode::Char('x'));
        assert_eq!(ev.mods, KeyModifiers::empty());
    }

    #[test]
    fn chorded_token_carries_mods() {
        let token = KeyToken::Chord {
            base: Box::new(KeyToken::Char('s')),
            mods: ModMask::CTRL,
        };
        let ev = key_token_to_key_event(&token).expect("chord maps");
        assert_eq!(ev.code, KeyCode::Char('s'));
        assert!(ev.mods.contains(KeyModifiers::CTRL));
    }

    #[test]
    fn unmapped_named_key_returns_none() {
        assert!(key_token_to_key_event(&KeyToken::Named(NamedKey::F(1))).is_none());
    }
}
