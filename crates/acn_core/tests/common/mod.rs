#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Once;

use acn_core::{
    Message, NodeId, NodeLiveness, PageGeometry, PanelCommand, PanelSurface, Rect, Role, RowView,
    Viewport,
};
use ego_tree::Tree;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(acn_logging::initialize_for_tests);
}

/// Records every command and answers measurement queries from fixed values.
pub struct FakeSurface {
    pub commands: Vec<PanelCommand>,
    pub viewport: Viewport,
    pub row_height: Option<f32>,
    pub existing_panel: bool,
}

impl FakeSurface {
    pub fn new(height: f32, row_height: Option<f32>) -> Self {
        Self {
            commands: Vec::new(),
            viewport: Viewport {
                height,
                scroll_top: 0.0,
            },
            row_height,
            existing_panel: false,
        }
    }

    pub fn renders(&self) -> Vec<(f32, f32, Vec<RowView>)> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                PanelCommand::RenderRows {
                    top_spacer,
                    bottom_spacer,
                    rows,
                } => Some((*top_spacer, *bottom_spacer, rows.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn last_rendered_ids(&self) -> Vec<String> {
        self.renders()
            .last()
            .map(|(_, _, rows)| rows.iter().map(|row| row.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl PanelSurface for FakeSurface {
    fn panel_exists(&self) -> bool {
        self.existing_panel
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn apply(&mut self, command: PanelCommand) {
        self.commands.push(command);
    }

    fn measure_row_height(&self) -> Option<f32> {
        self.row_height
    }
}

/// Owns a scratch tree so tests can mint distinct node ids.
pub struct NodePool {
    tree: Tree<u32>,
}

impl NodePool {
    pub fn new() -> Self {
        Self { tree: Tree::new(0) }
    }

    pub fn node(&mut self) -> NodeId {
        let next = self.tree.nodes().count() as u32;
        self.tree.root_mut().append(next).id()
    }
}

pub fn message(pool: &mut NodePool, id: &str, role: Role, content: &str) -> Message {
    let element = pool.node();
    Message {
        id: id.to_string(),
        role,
        content: content.to_string(),
        timestamp: String::new(),
        element,
        highlight: element,
    }
}

pub fn numbered(pool: &mut NodePool, count: usize) -> Vec<Message> {
    (0..count)
        .map(|i| message(pool, &format!("m{i}"), Role::Ai, &format!("message number {i}")))
        .collect()
}

/// Page stand-in with explicit layout and attachment state.
#[derive(Default)]
pub struct FakePage {
    pub detached: HashSet<NodeId>,
    pub rects: HashMap<NodeId, Rect>,
    pub viewport_height: f32,
}

impl NodeLiveness for FakePage {
    fn is_connected(&self, node: NodeId) -> bool {
        !self.detached.contains(&node)
    }
}

impl PageGeometry for FakePage {
    fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    fn element_rect(&self, node: NodeId) -> Option<Rect> {
        self.rects.get(&node).copied()
    }
}
