use std::env;
use std::path::{Path, PathBuf};

/// Headers covering every primitive the bridge consumes.
const HEADERS: &[&str] = &["fpdfview.h", "fpdf_doc.h", "fpdf_text.h"];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=PDFIUM_LIB_DIR");
    println!("cargo:rerun-if-env-changed=PDFIUM_INCLUDE_DIR");

    let target = env::var("TARGET").unwrap();

    let lib_dir = match env::var("PDFIUM_LIB_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => panic!(
            "PDFIUM_LIB_DIR is not set. Point it at a directory containing the \
             pdfium shared library (and optionally an include/ directory with headers)."
        ),
    };

    let include_dir = match env::var("PDFIUM_INCLUDE_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => find_include_dir(&lib_dir),
    };

    println!("cargo:warning=Using PDFIUM_LIB_DIR: {}", lib_dir.display());
    setup_linking(&lib_dir, &target);
    generate_bindings(&include_dir);
}

fn find_include_dir(lib_dir: &Path) -> PathBuf {
    // Release tarballs ship include/ next to lib/, a source checkout keeps public/.
    let candidates = [
        lib_dir.join("include"),
        lib_dir.join("../include"),
        lib_dir.join("../../public"),
    ];
    for candidate in &candidates {
        if candidate.join("fpdfview.h").exists() {
            return candidate.clone();
        }
    }
    panic!(
        "Cannot find PDFium headers. Looked in {:?}. Set PDFIUM_INCLUDE_DIR.",
        candidates
    );
}

fn setup_linking(lib_dir: &Path, target: &str) {
    println!("cargo:rustc-link-search=native={}", lib_dir.display());
    println!("cargo:rustc-link-lib=dylib=pdfium");

    // Add rpath for runtime library discovery (macOS/Linux)
    if target.contains("apple") || target.contains("linux") {
        println!("cargo:rustc-link-arg=-Wl,-rpath,{}", lib_dir.display());
    }
}

fn generate_bindings(include_dir: &Path) {
    println!("cargo:rerun-if-changed={}", include_dir.display());

    let mut builder = bindgen::Builder::default();
    for header in HEADERS {
        builder = builder.header(include_dir.join(header).to_string_lossy().into_owned());
    }

    let bindings = builder
        .clang_arg(format!("-I{}", include_dir.display()))
        .parse_callbacks(Box::new(bindgen::CargoCallbacks::new()))
        // Library lifecycle and documents
        .allowlist_function("FPDF_InitLibrary")
        .allowlist_function("FPDF_DestroyLibrary")
        .allowlist_function("FPDF_GetLastError")
        .allowlist_function("FPDF_LoadCustomDocument")
        .allowlist_function("FPDF_LoadMemDocument")
        .allowlist_function("FPDF_CloseDocument")
        .allowlist_function("FPDF_GetPageCount")
        .allowlist_function("FPDF_GetPageSizeByIndex")
        .allowlist_function("FPDF_GetMetaText")
        .allowlist_function("FPDF_VIEWERREF_GetPrintScaling")
        // Pages and rendering
        .allowlist_function("FPDF_LoadPage")
        .allowlist_function("FPDF_ClosePage")
        .allowlist_function("FPDF_RenderPageBitmap")
        .allowlist_function("FPDF_PageToDevice")
        .allowlist_function("FPDFBitmap_CreateEx")
        .allowlist_function("FPDFBitmap_FillRect")
        .allowlist_function("FPDFBitmap_Destroy")
        // Outline, links, actions
        .allowlist_function("FPDFBookmark_.*")
        .allowlist_function("FPDFLink_Enumerate")
        .allowlist_function("FPDFLink_GetDest")
        .allowlist_function("FPDFLink_GetAction")
        .allowlist_function("FPDFLink_GetAnnotRect")
        .allowlist_function("FPDFAction_GetURIPath")
        .allowlist_function("FPDFDest_GetDestPageIndex")
        // Text and search
        .allowlist_function("FPDFText_.*")
        .allowlist_type("FPDF.*")
        .allowlist_type("FS_RECTF")
        .allowlist_var("FPDF_ERR_.*")
        .allowlist_var("FPDF_ANNOT")
        .allowlist_var("FPDF_LCD_TEXT")
        .allowlist_var("FPDF_REVERSE_BYTE_ORDER")
        .allowlist_var("FPDFBitmap_.*")
        .allowlist_var("FPDF_MATCH.*")
        .allowlist_var("FPDF_CONSECUTIVE")
        .opaque_type("fpdf_.*")
        .generate()
        .expect("Unable to generate bindings");

    let out_path = PathBuf::from(env::var("OUT_DIR").unwrap());
    bindings
        .write_to_file(out_path.join("bindings.rs"))
        .expect("Couldn't write bindings!");
}
