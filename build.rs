fn main() {
    // Only run on Windows
    #[cfg(target_os = "windows")]
    {
        // Embed version metadata into the executable
        let mut res = winresource::WindowsResource::new();
        res.set("ProductName", "ScreensTranslate");
        res.set("FileDescription", "Capture, OCR and translate any region of the screen");
        res.set("LegalCopyright", "Copyright (c) 2025");
        res.compile().expect("Failed to compile Windows resources");
    }
}
