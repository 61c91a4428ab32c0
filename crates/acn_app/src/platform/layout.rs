use acn_core::{Message, Rect};
use acn_engine::HtmlTree;

pub const PAGE_VIEWPORT_HEIGHT: f32 = 800.0;
const LINE_HEIGHT: f32 = 20.0;
const CHARS_PER_LINE: usize = 90;
const BLOCK_PADDING: f32 = 24.0;
const BLOCK_GAP: f32 = 16.0;

/// Stacks message blocks top to bottom with heights derived from their text
/// length, standing in for the browser's layout of a saved page.
pub fn stack_messages(host: &mut HtmlTree, messages: &[Message]) {
    host.set_viewport_height(PAGE_VIEWPORT_HEIGHT);
    let mut top = 0.0;
    for msg in messages {
        let lines = msg.content.chars().count().div_ceil(CHARS_PER_LINE).max(1);
        let bottom = top + lines as f32 * LINE_HEIGHT + BLOCK_PADDING;
        let rect = Rect { top, bottom };
        host.set_layout(msg.element, rect);
        if msg.highlight != msg.element {
            host.set_layout(msg.highlight, rect);
        }
        top = bottom + BLOCK_GAP;
    }
}
