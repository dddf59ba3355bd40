use anyhow::{anyhow, Result};
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::WindowCanvas;

use chip8vm::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use chip8vm::FrameBuffer;

/// # Display
/// The Chip-8 display is composed of 64x32 black/white pixels, each drawn as a `scale` sized square.
/// It only gets a call to `render` when the coordinator publishes a new frame.
pub struct Display {
    canvas: WindowCanvas,
}

impl Display {
    /// Opens a window bound to an sdl2 context
    ///
    /// # Arguments
    /// * `sdl` an sdl2 context with which to draw
    /// * `scale` the size multiplier for each pixel
    pub fn new(sdl: &sdl2::Sdl, scale: u32) -> Result<Self> {
        let video = sdl.video().map_err(|e| anyhow!(e))?;
        let window = video
            .window(
                "chip8",
                DISPLAY_WIDTH as u32 * scale,
                DISPLAY_HEIGHT as u32 * scale,
            )
            .position_centered()
            .build()?;
        let mut canvas = window.into_canvas().build()?;
        canvas.clear();
        canvas.present();

        Ok(Display { canvas })
    }

    /// Formats a FrameBuffer as concatenated rows of RGB24 pixels, lit pixels white
    fn frame_to_sdl_texture(frame: &FrameBuffer) -> Vec<u8> {
        frame
            .iter()
            .flatten()
            .flat_map(|&pixel| [pixel * 255; 3])
            .collect()
    }

    pub fn render(&mut self, frame: &FrameBuffer) -> Result<()> {
        let texture_creator = self.canvas.texture_creator();
        let mut texture = texture_creator.create_texture_streaming(
            PixelFormatEnum::RGB24,
            DISPLAY_WIDTH as u32,
            DISPLAY_HEIGHT as u32,
        )?;

        let pixels = Display::frame_to_sdl_texture(frame);
        texture
            .with_lock(None, |buffer: &mut [u8], pitch: usize| {
                for (row, line) in pixels.chunks_exact(DISPLAY_WIDTH * 3).enumerate() {
                    buffer[row * pitch..row * pitch + line.len()].copy_from_slice(line);
                }
            })
            .map_err(|e| anyhow!(e))?;

        self.canvas.copy(&texture, None, None).map_err(|e| anyhow!(e))?;
        self.canvas.present();
        Ok(())
    }
}
