//! Runtime configuration for a bridge.

use crate::engine::RenderFlags;

/// Opaque white, in the engine's ARGB layout.
pub const WHITE: u32 = 0xFFFF_FFFF;

/// Settings applied to every render issued through a bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    lcd_text: bool,
    default_background: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            lcd_text: true,
            default_background: WHITE,
        }
    }
}

impl BridgeConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use LCD-optimized text rendering.
    ///
    /// Default: enabled
    pub fn set_lcd_text(mut self, enabled: bool) -> Self {
        self.lcd_text = enabled;
        self
    }

    /// Background used by [`crate::Bridge::render_page_bitmap_default`].
    /// Zero disables the fill.
    ///
    /// Default: opaque white
    pub fn set_default_background(mut self, argb: u32) -> Self {
        self.default_background = argb;
        self
    }

    pub fn lcd_text(&self) -> bool {
        self.lcd_text
    }

    pub fn default_background(&self) -> u32 {
        self.default_background
    }

    /// Engine flags for a render, with or without the annotation layer.
    pub fn render_flags(&self, annotations: bool) -> RenderFlags {
        let mut flags = RenderFlags::REVERSE_BYTE_ORDER;
        if self.lcd_text {
            flags |= RenderFlags::LCD_TEXT;
        }
        if annotations {
            flags |= RenderFlags::ANNOT;
        }
        flags
    }
}
