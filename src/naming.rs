/// Picks `base` if free, otherwise the first free `base.001`, `base.002`, ...
pub fn unique_name(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }

    (1..)
        .map(|n| format!("{base}.{n:03}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_name_is_kept() {
        assert_eq!(unique_name("Sphere", |_| false), "Sphere");
    }

    #[test]
    fn clashing_names_get_numbered() {
        let taken = ["Sphere", "Sphere.001"];
        assert_eq!(unique_name("Sphere", |n| taken.contains(&n)), "Sphere.002");
    }
}
