//! Screenshot capture using GDI `BitBlt` over the virtual desktop.

use anyhow::{anyhow, Result};
use image::RgbaImage;

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HBITMAP, HDC,
    HGDIOBJ, SRCCOPY,
};
use windows::Win32::UI::HiDpi::{SetProcessDpiAwareness, PROCESS_PER_MONITOR_DPI_AWARE};
use windows::Win32::UI::WindowsAndMessaging::{
    GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN,
};

use super::bgra_to_rgba;
use crate::automation::collaborators::ScreenCapture;

/// Opts the process into per-monitor DPI awareness so system metrics, the
/// GDI grab and `SendInput` all use physical pixels. Call before capturing.
pub fn enable_dpi_awareness() {
    // Fails harmlessly when a manifest already set the awareness
    if let Err(e) = unsafe { SetProcessDpiAwareness(PROCESS_PER_MONITOR_DPI_AWARE) } {
        crate::log(&format!("DPI awareness not changed: {}", e));
    }
}

/// Bounds of the virtual desktop spanning every monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualScreen {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl VirtualScreen {
    pub fn current() -> Self {
        unsafe {
            Self {
                left: GetSystemMetrics(SM_XVIRTUALSCREEN),
                top: GetSystemMetrics(SM_YVIRTUALSCREEN),
                width: GetSystemMetrics(SM_CXVIRTUALSCREEN),
                height: GetSystemMetrics(SM_CYVIRTUALSCREEN),
            }
        }
    }
}

/// Captures the whole virtual desktop. Pixel (0, 0) of the result is the
/// desktop's top-left corner, which the pointer uses as its origin too.
pub struct GdiScreenCapture;

impl ScreenCapture for GdiScreenCapture {
    fn capture(&self) -> Result<RgbaImage> {
        let screen = VirtualScreen::current();
        if screen.width <= 0 || screen.height <= 0 {
            return Err(anyhow!(
                "Invalid virtual screen size {}x{}",
                screen.width,
                screen.height
            ));
        }

        let pixels = unsafe { grab_pixels(screen)? };
        bgra_to_rgba(screen.width as u32, screen.height as u32, pixels)
    }
}

/// Copies the screen into a memory bitmap and reads it back as top-down BGRA.
unsafe fn grab_pixels(screen: VirtualScreen) -> Result<Vec<u8>> {
    unsafe {
        let screen_dc = GetDC(HWND::default());
        if screen_dc.is_invalid() {
            return Err(anyhow!("GetDC failed"));
        }

        let mem_dc = CreateCompatibleDC(screen_dc);
        let bitmap = CreateCompatibleBitmap(screen_dc, screen.width, screen.height);
        let previous = SelectObject(mem_dc, HGDIOBJ(bitmap.0));

        let blit = BitBlt(
            mem_dc,
            0,
            0,
            screen.width,
            screen.height,
            screen_dc,
            screen.left,
            screen.top,
            SRCCOPY,
        );
        // The bitmap must not stay selected while GetDIBits reads it
        SelectObject(mem_dc, previous);

        let result = blit
            .map_err(|e| anyhow!("BitBlt failed: {}", e))
            .and_then(|()| read_bitmap(screen_dc, bitmap, screen));

        let _ = DeleteObject(HGDIOBJ(bitmap.0));
        let _ = DeleteDC(mem_dc);
        ReleaseDC(HWND::default(), screen_dc);

        result
    }
}

unsafe fn read_bitmap(dc: HDC, bitmap: HBITMAP, screen: VirtualScreen) -> Result<Vec<u8>> {
    let mut info = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: screen.width,
            // Negative height requests top-down rows
            biHeight: -screen.height,
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut pixels = vec![0u8; screen.width as usize * screen.height as usize * 4];

    let lines = unsafe {
        GetDIBits(
            dc,
            bitmap,
            0,
            screen.height as u32,
            Some(pixels.as_mut_ptr().cast()),
            &mut info,
            DIB_RGB_COLORS,
        )
    };
    if lines != screen.height {
        return Err(anyhow!(
            "GetDIBits copied {} of {} lines",
            lines,
            screen.height
        ));
    }
    Ok(pixels)
}
