//! Display controller register map (overlay/DSI command path subset).
//!
//! Offsets are relative to the controller base. Only the registers the
//! overlay core touches directly are listed; pipe, mixer and DMA registers
//! stay behind the collaborator traits.
//!
//! | Offset    | Name                 | Use                                  |
//! |-----------|----------------------|--------------------------------------|
//! | `0x000a0` | DSI stream id        | route DMA_P to stream 0, DMA_S to 1  |
//! | `0x000a4` | DSI trigger select   | trigger DSI on DMA_P completion      |
//! | `0x0020c` | Tear-check enable    | bit N gates channel N on vsync       |
//! | `0x00210` | Primary start line   | tear-safe line for channel 0         |
//! | `0x00214` | Secondary start line | tear-safe line for channel 1         |

/// DSI stream id register.
pub const DSI_STREAM_ID: u32 = 0x0_00a0;

/// Stream routing: DMA_P on stream 0, DMA_S on stream 1.
pub const DSI_STREAM_ID_DMA_P0_DMA_S1: u32 = 0x10;

/// DSI trigger select register.
pub const DSI_TRIGGER_SELECT: u32 = 0x0_00a4;

/// Trigger the DSI command engine from DMA_P.
pub const DSI_TRIGGER_ON_DMA_P: u32 = 0x01;

/// Tear-check enable register, one bit per output channel.
pub const TEAR_CHECK_ENABLE: u32 = 0x0_020c;

/// Start-line register for the primary channel.
pub const PRIMARY_START_LINE: u32 = 0x0_0210;

/// Start-line register for the secondary channel.
pub const SECONDARY_START_LINE: u32 = 0x0_0214;

/// Memory-mapped register access.
pub trait RegisterBlock {
    /// Read a 32-bit register.
    fn read(&self, offset: u32) -> u32;

    /// Write a 32-bit register.
    fn write(&mut self, offset: u32, value: u32);

    /// Order all preceding register writes before anything that follows.
    fn barrier(&mut self) {
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
    }

    /// Read-modify-write helper.
    fn modify(&mut self, offset: u32, f: impl FnOnce(u32) -> u32) {
        let value = f(self.read(offset));
        self.write(offset, value);
    }
}
