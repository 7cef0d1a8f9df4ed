//! Product and file-type capability registries.
//!
//! Each product type and each known file extension is described exactly once.
//! Build-phase classification, product naming, linkage and embedding rules
//! are all table lookups against these registries.
//!
//! # Adding a New Product Type
//!
//! 1. Add a variant to `ProductType` in `value_objects.rs`
//! 2. Add one [`ProductDef`] entry to [`PRODUCT_REGISTRY`]
//!
//! # Adding a New File Type
//!
//! Add one [`FileTypeDef`] entry to [`FILE_TYPE_REGISTRY`]. Extensions not
//! listed fall back to a generic `file` reference in the resources phase.

use crate::domain::value_objects::{BuildPhase, Linkage, ProductType};

// ── Products ─────────────────────────────────────────────────────────────────

/// Describes what the graph needs to know about one product type.
#[derive(Debug, Clone, Copy)]
pub struct ProductDef {
    pub product: ProductType,

    /// Extension of the built product, empty for bare executables.
    pub extension: &'static str,

    /// `explicitFileType` of the product reference.
    pub file_type: &'static str,

    /// How dependers link this product.
    pub linkage: Linkage,

    /// Whether an application copies this product into its bundle.
    pub embeddable: bool,

    /// Info.plist `CFBundlePackageType`, or `None` when no plist is generated.
    pub package_type: Option<&'static str>,
}

pub static PRODUCT_REGISTRY: &[ProductDef] = &[
    ProductDef {
        product: ProductType::Application,
        extension: "app",
        file_type: "wrapper.application",
        linkage: Linkage::None,
        embeddable: false,
        package_type: Some("APPL"),
    },
    ProductDef {
        product: ProductType::Framework,
        extension: "framework",
        file_type: "wrapper.framework",
        linkage: Linkage::Dynamic,
        embeddable: true,
        package_type: None,
    },
    ProductDef {
        product: ProductType::StaticLibrary,
        extension: "a",
        file_type: "archive.ar",
        linkage: Linkage::Static,
        embeddable: false,
        package_type: None,
    },
    ProductDef {
        product: ProductType::DynamicLibrary,
        extension: "dylib",
        file_type: "compiled.mach-o.dylib",
        linkage: Linkage::Dynamic,
        embeddable: true,
        package_type: None,
    },
    ProductDef {
        product: ProductType::UnitTestBundle,
        extension: "xctest",
        file_type: "wrapper.cfbundle",
        linkage: Linkage::None,
        embeddable: false,
        package_type: Some("BNDL"),
    },
    ProductDef {
        product: ProductType::UiTestBundle,
        extension: "xctest",
        file_type: "wrapper.cfbundle",
        linkage: Linkage::None,
        embeddable: false,
        package_type: Some("BNDL"),
    },
    ProductDef {
        product: ProductType::AppExtension,
        extension: "appex",
        file_type: "wrapper.app-extension",
        linkage: Linkage::None,
        embeddable: true,
        package_type: Some("XPC!"),
    },
    ProductDef {
        product: ProductType::Bundle,
        extension: "bundle",
        file_type: "wrapper.cfbundle",
        linkage: Linkage::None,
        embeddable: false,
        package_type: None,
    },
    ProductDef {
        product: ProductType::CommandLineTool,
        extension: "",
        file_type: "compiled.mach-o.executable",
        linkage: Linkage::None,
        embeddable: false,
        package_type: None,
    },
];

pub fn find_product(product: ProductType) -> Option<&'static ProductDef> {
    PRODUCT_REGISTRY.iter().find(|def| def.product == product)
}

/// File name of the built product, e.g. `App.app` or `libCore.a`.
pub fn product_file_name(product: ProductType, name: &str) -> String {
    match find_product(product) {
        Some(def) if def.extension.is_empty() => name.to_string(),
        Some(def) if matches!(product, ProductType::StaticLibrary | ProductType::DynamicLibrary) => {
            format!("lib{name}.{}", def.extension)
        }
        Some(def) => format!("{name}.{}", def.extension),
        None => name.to_string(),
    }
}

pub fn product_linkage(product: ProductType) -> Linkage {
    find_product(product)
        .map(|def| def.linkage)
        .unwrap_or(Linkage::None)
}

pub fn is_embeddable(product: ProductType) -> bool {
    find_product(product)
        .map(|def| def.embeddable)
        .unwrap_or(false)
}

/// Whether a declaration (Info.plist) file is generated for this product.
pub fn needs_info_plist(product: ProductType) -> bool {
    find_product(product)
        .map(|def| def.package_type.is_some())
        .unwrap_or(false)
}

// ── File types ───────────────────────────────────────────────────────────────

/// Describes one file extension.
#[derive(Debug, Clone, Copy)]
pub struct FileTypeDef {
    pub extension: &'static str,

    /// `lastKnownFileType` written on the file reference.
    pub file_type: &'static str,

    /// Default phase; `None` keeps the file out of every phase.
    pub phase: Option<BuildPhase>,

    /// Directory with this extension is a single opaque reference.
    pub opaque_directory: bool,
}

const fn file_type(
    extension: &'static str,
    file_type: &'static str,
    phase: Option<BuildPhase>,
) -> FileTypeDef {
    FileTypeDef {
        extension,
        file_type,
        phase,
        opaque_directory: false,
    }
}

const fn package(
    extension: &'static str,
    file_type: &'static str,
    phase: Option<BuildPhase>,
) -> FileTypeDef {
    FileTypeDef {
        extension,
        file_type,
        phase,
        opaque_directory: true,
    }
}

const SOURCES: Option<BuildPhase> = Some(BuildPhase::Sources);
const HEADERS: Option<BuildPhase> = Some(BuildPhase::Headers);
const RESOURCES: Option<BuildPhase> = Some(BuildPhase::Resources);
const FRAMEWORKS: Option<BuildPhase> = Some(BuildPhase::Frameworks);

pub static FILE_TYPE_REGISTRY: &[FileTypeDef] = &[
    // ── compiled ─────────────────────────────────────────────────────────────
    file_type("swift", "sourcecode.swift", SOURCES),
    file_type("m", "sourcecode.c.objc", SOURCES),
    file_type("mm", "sourcecode.cpp.objcpp", SOURCES),
    file_type("c", "sourcecode.c.c", SOURCES),
    file_type("cc", "sourcecode.cpp.cpp", SOURCES),
    file_type("cpp", "sourcecode.cpp.cpp", SOURCES),
    file_type("cxx", "sourcecode.cpp.cpp", SOURCES),
    file_type("S", "sourcecode.asm", SOURCES),
    file_type("s", "sourcecode.asm", SOURCES),
    file_type("metal", "sourcecode.metal", SOURCES),
    file_type("intentdefinition", "file.intentdefinition", SOURCES),
    file_type("mlmodel", "file.mlmodel", SOURCES),
    package("xcdatamodeld", "wrapper.xcdatamodeld", SOURCES),
    package("xcdatamodel", "wrapper.xcdatamodel", SOURCES),
    package("xcmappingmodel", "wrapper.xcmappingmodel", SOURCES),
    package("rcproject", "file.rcproject", SOURCES),
    package("docc", "folder.documentationcatalog", SOURCES),
    package("mlpackage", "folder.mlpackage", SOURCES),
    // ── headers ──────────────────────────────────────────────────────────────
    file_type("h", "sourcecode.c.h", HEADERS),
    file_type("hh", "sourcecode.cpp.h", HEADERS),
    file_type("hpp", "sourcecode.cpp.h", HEADERS),
    file_type("hxx", "sourcecode.cpp.h", HEADERS),
    file_type("ipp", "sourcecode.cpp.h", HEADERS),
    file_type("tpp", "sourcecode.cpp.h", HEADERS),
    file_type("inl", "sourcecode.cpp.h", HEADERS),
    file_type("def", "text", HEADERS),
    // ── resources ────────────────────────────────────────────────────────────
    file_type("storyboard", "file.storyboard", RESOURCES),
    file_type("xib", "file.xib", RESOURCES),
    file_type("strings", "text.plist.strings", RESOURCES),
    file_type("stringsdict", "text.plist.stringsdict", RESOURCES),
    file_type("png", "image.png", RESOURCES),
    file_type("jpg", "image.jpeg", RESOURCES),
    file_type("jpeg", "image.jpeg", RESOURCES),
    file_type("pdf", "image.pdf", RESOURCES),
    file_type("json", "text.json", RESOURCES),
    file_type("plist", "text.plist.xml", RESOURCES),
    file_type("ttf", "file", RESOURCES),
    file_type("otf", "file", RESOURCES),
    file_type("md", "net.daringfireball.markdown", RESOURCES),
    package("xcassets", "folder.assetcatalog", RESOURCES),
    package("xcstickers", "folder.stickers", RESOURCES),
    package("scnassets", "wrapper.scnassets", RESOURCES),
    package("bundle", "wrapper.plug-in", RESOURCES),
    package("xctemplate", "wrapper.xctemplate", RESOURCES),
    // ── no phase ─────────────────────────────────────────────────────────────
    file_type("xcconfig", "text.xcconfig", None),
    file_type("entitlements", "text.plist.entitlements", None),
    file_type("gpx", "text.xml", None),
    file_type("apns", "text", None),
    file_type("modulemap", "sourcecode.module-map", None),
    file_type("xcfilelist", "text.xcfilelist", None),
    package("playground", "file.playground", None),
    package("lproj", "folder", None),
    // ── linkable ─────────────────────────────────────────────────────────────
    package("framework", "wrapper.framework", FRAMEWORKS),
    package("xcframework", "wrapper.xcframework", FRAMEWORKS),
    package("app", "wrapper.application", None),
    package("appex", "wrapper.app-extension", None),
    file_type("a", "archive.ar", FRAMEWORKS),
    file_type("dylib", "compiled.mach-o.dylib", FRAMEWORKS),
    file_type("tbd", "sourcecode.text-based-dylib-definition", FRAMEWORKS),
];

/// File names that never join a build phase regardless of extension.
pub const NO_PHASE_FILE_NAMES: &[&str] = &["Info.plist"];

pub fn find_file_type(extension: &str) -> Option<&'static FileTypeDef> {
    FILE_TYPE_REGISTRY
        .iter()
        .find(|def| def.extension == extension)
}

/// Default build phase for a file, by name then extension.
pub fn default_phase(file_name: &str, extension: Option<&str>) -> Option<BuildPhase> {
    if NO_PHASE_FILE_NAMES.contains(&file_name) {
        return None;
    }
    match extension.and_then(find_file_type) {
        Some(def) => def.phase,
        None => Some(BuildPhase::Resources),
    }
}

/// `lastKnownFileType` for a file reference.
pub fn last_known_file_type(extension: Option<&str>) -> &'static str {
    extension
        .and_then(find_file_type)
        .map(|def| def.file_type)
        .unwrap_or("file")
}

/// Whether a directory with this extension is treated as a single leaf.
///
/// `lproj` is excluded: localized directories are opened and coalesced
/// into variant groups.
pub fn is_opaque_directory(extension: &str) -> bool {
    extension != "lproj"
        && find_file_type(extension)
            .map(|def| def.opaque_directory)
            .unwrap_or(false)
}

// ── Registry integrity (checked in tests) ────────────────────────────────────

#[doc(hidden)]
pub fn assert_registry_integrity() {
    for product in [
        ProductType::Application,
        ProductType::Framework,
        ProductType::StaticLibrary,
        ProductType::DynamicLibrary,
        ProductType::UnitTestBundle,
        ProductType::UiTestBundle,
        ProductType::AppExtension,
        ProductType::Bundle,
        ProductType::CommandLineTool,
    ] {
        assert!(
            find_product(product).is_some(),
            "Product {product:?} is not registered"
        );
    }

    for (i, def) in FILE_TYPE_REGISTRY.iter().enumerate() {
        assert!(
            FILE_TYPE_REGISTRY[i + 1..]
                .iter()
                .all(|other| other.extension != def.extension),
            "Extension {:?} registered twice",
            def.extension
        );
    }
}
