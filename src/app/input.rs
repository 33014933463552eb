use eframe::egui::{Context, Event, Key, Modifiers};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(super) enum Shortcut {
    ClearSelection,
    OpenPalette,
    PalettePrevious,
    PaletteNext,
    PaletteConfirm,
    PaletteClose,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum ModifierRule {
    Any,
    NoneHeld,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct KeyBinding {
    pub key: Key,
    pub modifiers: ModifierRule,
    /// Whether the binding fires while a text field has keyboard focus.
    pub while_typing: bool,
}

impl KeyBinding {
    pub const fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: ModifierRule::Any,
            while_typing: false,
        }
    }

    pub const fn without_modifiers(mut self) -> Self {
        self.modifiers = ModifierRule::NoneHeld;
        self
    }

    pub const fn while_typing(mut self) -> Self {
        self.while_typing = true;
        self
    }

    fn accepts(self, press: KeyPress, typing: bool) -> bool {
        if press.key != self.key || (typing && !self.while_typing) {
            return false;
        }
        match self.modifiers {
            ModifierRule::Any => true,
            ModifierRule::NoneHeld => press.modifiers.is_none(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(super) struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    binding: KeyBinding,
    shortcut: Shortcut,
}

/// Single owner of keyboard shortcut listeners. Components subscribe while
/// mounted and unsubscribe when they go away.
#[derive(Default)]
pub(super) struct ShortcutDispatcher {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl ShortcutDispatcher {
    pub fn subscribe(&mut self, binding: KeyBinding, shortcut: Shortcut) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            binding,
            shortcut,
        });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|subscription| subscription.id != id);
        self.subscriptions.len() != before
    }

    pub fn unsubscribe_all(&mut self, ids: &mut Vec<SubscriptionId>) {
        for id in ids.drain(..) {
            self.unsubscribe(id);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn dispatch(&self, presses: &[KeyPress], typing: bool) -> Vec<Shortcut> {
        let mut fired = Vec::new();
        for press in presses {
            for subscription in &self.subscriptions {
                if subscription.binding.accepts(*press, typing) {
                    fired.push(subscription.shortcut);
                }
            }
        }
        fired
    }

    /// Shortcuts triggered by this frame's key presses.
    pub fn poll(&self, ctx: &Context) -> Vec<Shortcut> {
        if self.subscriptions.is_empty() {
            return Vec::new();
        }
        let presses = ctx.input(|input| {
            input
                .events
                .iter()
                .filter_map(|event| match event {
                    Event::Key {
                        key,
                        pressed: true,
                        repeat,
                        modifiers,
                        ..
                    } if !*repeat || matches!(key, Key::ArrowUp | Key::ArrowDown) => {
                        Some(KeyPress {
                            key: *key,
                            modifiers: *modifiers,
                        })
                    }
                    _ => None,
                })
                .collect::<Vec<_>>()
        });
        self.dispatch(&presses, ctx.wants_keyboard_input())
    }
}

/// Shortcuts active while the graph has the keyboard.
pub(super) fn graph_bindings() -> [(KeyBinding, Shortcut); 2] {
    [
        (KeyBinding::new(Key::Escape), Shortcut::ClearSelection),
        (
            KeyBinding::new(Key::Space).without_modifiers(),
            Shortcut::OpenPalette,
        ),
    ]
}

/// Shortcuts active while the command palette is open. They fire even though
/// the palette's query field has focus.
pub(super) fn palette_bindings() -> [(KeyBinding, Shortcut); 4] {
    [
        (KeyBinding::new(Key::ArrowUp).while_typing(), Shortcut::PalettePrevious),
        (KeyBinding::new(Key::ArrowDown).while_typing(), Shortcut::PaletteNext),
        (KeyBinding::new(Key::Enter).while_typing(), Shortcut::PaletteConfirm),
        (KeyBinding::new(Key::Escape).while_typing(), Shortcut::PaletteClose),
    ]
}

pub(super) fn subscribe_all(
    dispatcher: &mut ShortcutDispatcher,
    bindings: impl IntoIterator<Item = (KeyBinding, Shortcut)>,
) -> Vec<SubscriptionId> {
    bindings
        .into_iter()
        .map(|(binding, shortcut)| dispatcher.subscribe(binding, shortcut))
        .collect()
}
