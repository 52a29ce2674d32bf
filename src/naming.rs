//! Conversions between package names, resource paths and class identifiers.

pub const CLASS_SUFFIX: &str = ".class";

pub fn package_to_resource_path(package_name: &str) -> String {
    package_name.replace('.', "/")
}

pub fn class_name_to_class_path(class_name: &str) -> String {
    format!("{}{CLASS_SUFFIX}", class_name.replace('.', "/"))
}

/// Turns a jar entry such as `org/acme/Foo$Bar.class` into `org.acme.Foo$Bar`.
pub fn entry_name_to_class_name(entry_name: &str) -> Option<String> {
    let stem = entry_name.strip_suffix(CLASS_SUFFIX)?;
    if stem.is_empty() || stem.ends_with('/') {
        return None;
    }
    Some(stem.replace(['/', '\\'], "."))
}

/// Appends `segment` to a package name, treating the empty name as the root namespace.
pub fn join_package(package_name: &str, segment: &str) -> String {
    if package_name.is_empty() {
        segment.to_string()
    } else {
        format!("{package_name}.{segment}")
    }
}
