use ash::vk;

/// Shader pair of a full-screen quad draw, addressed by built-in shader path.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct QuadShaders {
    pub vertex: &'static str,
    pub fragment: &'static str,
}

impl QuadShaders {
    pub const fn new(vertex: &'static str, fragment: &'static str) -> Self {
        Self { vertex, fragment }
    }
}

/// Fixed function state of a full-screen quad draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuadDrawState {
    pub depth_test: bool,
    /// Only effective when `depth_test` is enabled.
    pub depth_write: bool,
    pub depth_compare: vk::CompareOp,
}

impl Default for QuadDrawState {
    fn default() -> Self {
        Self::no_depth()
    }
}

impl QuadDrawState {
    pub fn no_depth() -> Self {
        Self {
            depth_test: false,
            depth_write: false,
            depth_compare: vk::CompareOp::ALWAYS,
        }
    }

    pub fn depth(depth_test: bool, depth_write: bool, depth_compare: vk::CompareOp) -> Self {
        Self {
            depth_test,
            depth_write,
            depth_compare,
        }
    }
}
