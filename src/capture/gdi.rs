//! GDI screen grabber (BitBlt from the desktop DC)

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC,
    GetDIBits, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS,
    SRCCOPY,
};
use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};
use tracing::debug;

use super::{CaptureError, CapturedImage, ScreenGrabber, ScreenRect};

pub struct GdiGrabber;

impl ScreenGrabber for GdiGrabber {
    fn grab(&self, region: ScreenRect) -> Result<CapturedImage, CaptureError> {
        if region.is_degenerate() {
            return Err(CaptureError::DegenerateRegion(region));
        }

        debug!("GDI capture of {}", region);
        let bgra = unsafe { blit_region(region)? };

        CapturedImage::from_bgra(&bgra, region)
            .ok_or_else(|| CaptureError::Backend("unexpected bitmap size".to_string()))
    }

    fn screen_bounds(&self) -> Option<ScreenRect> {
        let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        (width > 0 && height > 0).then(|| ScreenRect::new(0, 0, width, height))
    }
}

/// Copy the region into a 32-bit top-down DIB and return its BGRA bytes
unsafe fn blit_region(region: ScreenRect) -> Result<Vec<u8>, CaptureError> {
    let screen_dc = GetDC(HWND::default());
    if screen_dc.is_invalid() {
        return Err(CaptureError::Backend("GetDC failed".to_string()));
    }

    let mem_dc = CreateCompatibleDC(screen_dc);
    let bitmap = CreateCompatibleBitmap(screen_dc, region.width, region.height);
    let previous = SelectObject(mem_dc, bitmap);

    let blit = BitBlt(
        mem_dc,
        0,
        0,
        region.width,
        region.height,
        screen_dc,
        region.left,
        region.top,
        SRCCOPY,
    );

    let mut info = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: region.width,
            // Negative height requests a top-down bitmap
            biHeight: -region.height,
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut buffer = vec![0u8; (region.width as usize) * (region.height as usize) * 4];
    let rows = GetDIBits(
        mem_dc,
        bitmap,
        0,
        region.height as u32,
        Some(buffer.as_mut_ptr().cast()),
        &mut info,
        DIB_RGB_COLORS,
    );

    SelectObject(mem_dc, previous);
    let _ = DeleteObject(bitmap);
    let _ = DeleteDC(mem_dc);
    ReleaseDC(HWND::default(), screen_dc);

    blit.map_err(|e| CaptureError::Backend(format!("BitBlt failed: {}", e)))?;
    if rows == 0 {
        return Err(CaptureError::Backend("GetDIBits returned no rows".to_string()));
    }

    Ok(buffer)
}
