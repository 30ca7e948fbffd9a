use resolve_core::sampler::FilterMode;
use resolve_core::OutputSlot;

// ---------------------------------------------------------------------------
// Key — windowing-library-independent key representation
// ---------------------------------------------------------------------------

/// A keyboard key, independent of any windowing library.
///
/// `main.rs` maps `winit::keyboard::PhysicalKey` → `Key`; everything else
/// in the input pipeline works purely with this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Tab,
    F,
    Q,
    Escape,
}

// ---------------------------------------------------------------------------
// InputAction — what the preview does in response to input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Show the other output slot.
    ToggleSlot,
    /// Switch the image sampler between nearest and linear.
    ToggleFilter,
    Quit,
}

pub fn action_for(key: Key) -> InputAction {
    match key {
        Key::Tab => InputAction::ToggleSlot,
        Key::F => InputAction::ToggleFilter,
        Key::Q | Key::Escape => InputAction::Quit,
    }
}

pub fn next_slot(slot: OutputSlot) -> OutputSlot {
    match slot {
        OutputSlot::Color => OutputSlot::Coord,
        OutputSlot::Coord => OutputSlot::Color,
    }
}

pub fn toggled_filter(filter: FilterMode) -> FilterMode {
    match filter {
        FilterMode::Nearest => FilterMode::Linear,
        FilterMode::Linear => FilterMode::Nearest,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
