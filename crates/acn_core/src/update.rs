use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::MessagesScanned { count } => {
            state.set_message_count(count);
            let mut effects = vec![Effect::PushMessages];
            if state.is_loading() && state.visible() {
                state.set_loading(false);
                effects.push(Effect::SetLoading(false));
            }
            effects.push(Effect::RefreshActive);
            effects
        }
        Msg::ToggleRequested => {
            let next = !state.visible();
            set_visible(&mut state, next)
        }
        Msg::VisibilityRequested(visible) => set_visible(&mut state, visible),
        Msg::RouteChanged(url) => {
            if !state.navigate(url) {
                return (state, Vec::new());
            }
            state.set_message_count(0);
            let mut effects = vec![Effect::ClearMessages];
            if state.visible() {
                state.set_loading(true);
                effects.push(Effect::SetLoading(true));
                effects.push(Effect::RequestScan);
            }
            effects
        }
        Msg::SettingsChanged(patch) => {
            if patch.is_empty() {
                return (state, Vec::new());
            }
            state.apply_settings(&patch);
            vec![Effect::ApplySettings(patch)]
        }
        Msg::PersistRequested(patch) => {
            if patch.is_empty() {
                return (state, Vec::new());
            }
            state.apply_settings(&patch);
            vec![Effect::PersistSettings(patch)]
        }
        Msg::PageScrolled => {
            if state.visible() && state.message_count() > 0 {
                vec![Effect::RefreshActive]
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}

fn set_visible(state: &mut AppState, visible: bool) -> Vec<Effect> {
    state.set_visible(visible);
    let mut effects = vec![Effect::ShowPanel(visible)];

    if !visible {
        state.set_loading(false);
        effects.push(Effect::SetLoading(false));
        if state.scanner_active() {
            state.set_scanner_active(false);
            effects.push(Effect::StopScanner);
        }
        effects.push(Effect::Reply { visible });
        return effects;
    }

    if !state.scanner_active() {
        state.set_scanner_active(true);
        effects.push(Effect::StartScanner { immediate: false });
    }
    if state.message_count() > 0 {
        effects.push(Effect::PushMessages);
        state.set_loading(false);
        effects.push(Effect::SetLoading(false));
    } else {
        state.set_loading(true);
        effects.push(Effect::SetLoading(true));
    }
    effects.push(Effect::RequestScan);
    effects.push(Effect::Reply { visible });
    effects
}
