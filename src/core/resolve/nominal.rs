use crate::core::checker::Type;

/// Whether `ty` is, or has a union or intersection constituent that is, the
/// named type `target`. Only declared names count; printed types are never
/// inspected.
pub fn matches_flag_set(ty: &Type, target: &str) -> bool {
    match ty {
        Type::Union(members) | Type::Intersection(members) => {
            members.iter().any(|member| matches_flag_set(member, target))
        }
        Type::Named(named) => named.name == target,
        _ => false,
    }
}
