use ash::vk;

/// How the extent of a resource is decided.
#[derive(Clone, Debug, PartialEq)]
pub enum SizeClass {
    Absolute { width: u32, height: u32 },
    /// Same extent as the named resource, multiplied by the attachment scale.
    InputRelative(String),
}

/// Logical description of an image resource inside the render graph.
#[derive(Clone, Debug, PartialEq)]
pub struct AttachmentInfo {
    pub size_class: SizeClass,
    pub scale: [f32; 2],
    /// `None` inherits the format of the resource the size is relative to.
    pub format: Option<vk::Format>,
    pub unorm_srgb_alias: bool,
}

impl AttachmentInfo {
    pub fn absolute(width: u32, height: u32) -> Self {
        Self {
            size_class: SizeClass::Absolute { width, height },
            scale: [1.0, 1.0],
            format: None,
            unorm_srgb_alias: false,
        }
    }

    pub fn relative(name: impl Into<String>) -> Self {
        Self {
            size_class: SizeClass::InputRelative(name.into()),
            scale: [1.0, 1.0],
            format: None,
            unorm_srgb_alias: false,
        }
    }

    #[inline]
    pub fn format(mut self, format: vk::Format) -> Self {
        self.format = Some(format);
        self
    }

    #[inline]
    pub fn scale(mut self, scale_x: f32, scale_y: f32) -> Self {
        self.scale = [scale_x, scale_y];
        self
    }

    #[inline]
    pub fn unorm_srgb_alias(mut self, alias: bool) -> Self {
        self.unorm_srgb_alias = alias;
        self
    }

    /// Name of the resource this one is sized relative to.
    pub fn relative_to(&self) -> Option<&str> {
        match &self.size_class {
            SizeClass::InputRelative(name) => Some(name),
            SizeClass::Absolute { .. } => None,
        }
    }
}

/// How a resource is attached when a pass writes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceRole {
    Color,
    DepthStencil,
}

/// `max(1, round(base * scale))`, a unit scale keeps the base extent as is.
#[inline]
pub(crate) fn scaled_extent(base: [u32; 2], scale: [f32; 2]) -> [u32; 2] {
    let scaled = |base: u32, scale: f32| {
        if scale == 1.0 {
            base.max(1)
        } else {
            ((base as f64 * scale as f64).round() as u32).max(1)
        }
    };
    [scaled(base[0], scale[0]), scaled(base[1], scale[1])]
}
