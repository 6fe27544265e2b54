//! The render surface: one native window, one swap chain, one import cache.

use std::fmt;

use novade_buffer_cache::{BufferImporter, BufferObjectCache, ExternalHandle, PixelFormat};
use tracing::{debug, error, info};

use crate::channel::{NativeWindow, PresentMode, PresentationChannel};
use crate::config::{ConfigLoader, SurfaceConfig};
use crate::controller::{AcquireSubmitController, BackBuffer};
use crate::error::{Result, SurfaceError};
use crate::swapchain::SwapChain;

/// Layout of the current back buffer as the renderer needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackBufferInfo {
    pub handle: ExternalHandle,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub bytes_per_pixel: u32,
    pub buffer_age: u32,
}

/// A window surface backed by the compositor's presentation chain.
///
/// Created with a back buffer already acquired. Each [`swap_buffers`] presents
/// it and acquires the next one, following the window size.
///
/// [`swap_buffers`]: Surface::swap_buffers
pub struct Surface<W: NativeWindow, I: BufferImporter> {
    window: W,
    format: PixelFormat,
    controller: AcquireSubmitController<W::Channel, I>,
    width: u32,
    height: u32,
    destroyed: bool,
}

impl<W: NativeWindow, I: BufferImporter> Surface<W, I> {
    /// Creates a surface for `window` in the pixel format of `visual_id`.
    ///
    /// # Errors
    /// - [`SurfaceError::BadNativeWindow`] if the window is not valid.
    /// - [`SurfaceError::UnsupportedFormat`] for an unknown visual.
    /// - [`SurfaceError::BadPresentationChain`] if the window has no chain.
    /// - [`SurfaceError::Config`] if `config`, after applying
    ///   `NOVADE_EGL_CLIENT_BUFFERS`, does not validate.
    /// - [`SurfaceError::SwapChain`] if the buffers cannot be allocated.
    /// - Any error of the initial acquire.
    pub fn create(window: W, visual_id: u32, importer: I, config: &SurfaceConfig) -> Result<Self> {
        if !window.is_valid() {
            error!("Native window is not valid");
            return Err(SurfaceError::BadNativeWindow);
        }
        let format = PixelFormat::from_visual_id(visual_id).ok_or_else(|| {
            error!(visual_id, "Unsupported pixel format");
            SurfaceError::UnsupportedFormat(visual_id)
        })?;
        let channel = window.presentation_chain().ok_or_else(|| {
            error!("Native window has no presentation chain");
            SurfaceError::BadPresentationChain
        })?;

        let mut config = config.clone();
        ConfigLoader::apply_env_overrides(&mut config);
        ConfigLoader::validate(&mut config)?;

        let (width, height) = window.size();
        let buffer_count = config.buffer_count;
        info!(width, height, %format, buffer_count, "Creating render surface");

        let swap_chain = SwapChain::allocate(channel, buffer_count, (width, height), format)?
            .with_acquire_timeout(config.acquire_timeout());
        let controller = AcquireSubmitController::new(swap_chain, BufferObjectCache::new(importer));

        let mut surface = Self {
            window,
            format,
            controller,
            width,
            height,
            destroyed: false,
        };
        let back = surface.controller.acquire((width, height))?;
        surface.track_size(&back);
        Ok(surface)
    }

    fn track_size(&mut self, back: &BackBuffer) {
        if back.width != 0 && back.height != 0 {
            self.width = back.width;
            self.height = back.height;
        }
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed {
            return Err(SurfaceError::Destroyed);
        }
        Ok(())
    }

    /// Presents the back buffer and acquires the next one at the window's
    /// current size.
    pub fn swap_buffers(&mut self) -> Result<()> {
        self.ensure_alive()?;
        let target = self.window.size();
        let back = self.controller.submit(target)?;
        self.track_size(&back);
        debug!(handle = %back.handle, age = back.buffer_age, "Swapped buffers");
        Ok(())
    }

    /// Selects mailbox (`0`) or fifo (`1`) presentation.
    ///
    /// # Errors
    /// [`SurfaceError::BadSwapInterval`] for any other interval.
    pub fn set_swap_interval(&mut self, interval: i32) -> Result<()> {
        self.ensure_alive()?;
        let mode = PresentMode::from_swap_interval(interval)
            .ok_or(SurfaceError::BadSwapInterval(interval))?;
        debug!(interval, ?mode, "Setting present mode");
        self.controller.swap_chain().channel().set_present_mode(mode);
        Ok(())
    }

    /// Age of the back buffer as reported by the presentation channel, `0`
    /// when there is none.
    pub fn query_buffer_age(&self) -> u32 {
        self.controller.buffer_age()
    }

    /// The imported object the renderer draws into.
    pub fn back_buffer(&self) -> Option<&I::Object> {
        self.controller.back_object()
    }

    pub fn back_buffer_info(&self) -> Option<BackBufferInfo> {
        self.controller.back_buffer().map(|back| BackBufferInfo {
            handle: back.handle,
            width: back.width,
            height: back.height,
            stride: back.stride,
            bytes_per_pixel: self.format.bytes_per_pixel(),
            buffer_age: back.buffer_age,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn controller(&self) -> &AcquireSubmitController<W::Channel, I> {
        &self.controller
    }

    /// Pixmaps have no presentation chain and cannot be rendered to.
    pub fn create_pixmap_surface() -> Result<Self> {
        error!("Pixmap surfaces are not supported");
        Err(SurfaceError::PixmapUnsupported)
    }

    /// Releases the import cache and every buffer, waiting for buffers still
    /// held by the presentation channel. Later calls do nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        info!(width = self.width, height = self.height, "Destroying render surface");
        self.controller.teardown();
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl<W: NativeWindow, I: BufferImporter> Drop for Surface<W, I> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<W: NativeWindow, I: BufferImporter> fmt::Debug for Surface<W, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("back", &self.controller.back_buffer())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}
