//! Convenience wrappers for common viewer commands

use crate::command;
use crate::error::Result;
use crate::io::session::Session;
use crate::io::transport::Transport;
use crate::protocol::pixel::Bitpix;
use crate::protocol::version::Version;

impl<T: Transport> Session<T> {
    /// Viewer version (`version`)
    pub fn version(&mut self) -> Result<Version> {
        self.get("version")
    }

    /// Current frame number
    pub fn frame(&mut self) -> Result<u32> {
        self.get("frame")
    }

    pub fn set_frame(&mut self, frame: u32) -> Result<()> {
        self.set(&command!("frame", frame))?;
        Ok(())
    }

    /// Zoom factor of the current frame
    pub fn zoom(&mut self) -> Result<f64> {
        self.get("zoom")
    }

    pub fn set_zoom(&mut self, zoom: f64) -> Result<()> {
        self.set(&command!("zoom", "to", zoom))?;
        Ok(())
    }

    /// Pan position in image coordinates
    pub fn pan(&mut self) -> Result<[f64; 2]> {
        self.get("pan image")
    }

    pub fn set_pan(&mut self, x: f64, y: f64) -> Result<()> {
        self.set(&command!("pan", "to", x, y, "image"))?;
        Ok(())
    }

    /// Name of the current colormap
    pub fn cmap(&mut self) -> Result<String> {
        self.get("cmap")
    }

    pub fn set_cmap(&mut self, name: &str) -> Result<()> {
        self.set(&command!("cmap", name))?;
        Ok(())
    }

    /// Dimensions `(x, y[, z])` of the displayed image
    pub fn image_size(&mut self) -> Result<Vec<usize>> {
        self.get("fits size")
    }

    /// Pixel type of the displayed image
    pub fn bitpix(&mut self) -> Result<Bitpix> {
        Bitpix::from_code(self.get("fits bitpix")?)
    }
}
