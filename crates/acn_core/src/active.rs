use crate::message::{Message, NodeId};
use crate::navigator::NodeLiveness;

/// Vertical extent of an element relative to the page viewport top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f32,
    pub bottom: f32,
}

/// Layout queries the active-item tracker needs from the page.
pub trait PageGeometry: NodeLiveness {
    fn viewport_height(&self) -> f32;
    fn element_rect(&self, node: NodeId) -> Option<Rect>;
}

/// Picks the message whose top edge is closest to the top of the viewport.
///
/// Elements entirely above the viewport are skipped but the last of them is
/// remembered, so scrolling past the final message keeps it active. The walk
/// stops at the first element below the viewport once a candidate exists.
pub fn pick_active<'a, G>(messages: &'a [Message], page: &G) -> Option<&'a str>
where
    G: PageGeometry + ?Sized,
{
    let viewport_height = page.viewport_height();
    let mut active: Option<&Message> = None;
    let mut best_distance = f32::INFINITY;
    let mut last_above: Option<&Message> = None;

    for message in messages {
        if !page.is_connected(message.element) {
            continue;
        }
        let Some(rect) = page.element_rect(message.element) else {
            continue;
        };
        if rect.bottom < 0.0 {
            last_above = Some(message);
            continue;
        }
        if rect.top > viewport_height && active.is_some() {
            break;
        }
        let distance = rect.top.abs();
        if distance < best_distance {
            best_distance = distance;
            active = Some(message);
        }
    }

    active.or(last_above).map(|message| message.id.as_str())
}
