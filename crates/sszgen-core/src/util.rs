use sha2::{Digest, Sha256};

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    let digest = h.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Renders a declared type the way it reads in source, for diagnostics and
/// for reproducing external type paths in generated code.
pub(crate) fn describe_type(ty: &syn::Type) -> String {
    match ty {
        syn::Type::Path(p) => {
            let mut out = String::new();
            if p.path.leading_colon.is_some() {
                out.push_str("::");
            }
            for (idx, seg) in p.path.segments.iter().enumerate() {
                if idx > 0 {
                    out.push_str("::");
                }
                out.push_str(&seg.ident.to_string());
                if let syn::PathArguments::AngleBracketed(args) = &seg.arguments {
                    let rendered: Vec<String> = args
                        .args
                        .iter()
                        .map(|a| match a {
                            syn::GenericArgument::Type(t) => describe_type(t),
                            _ => "_".to_string(),
                        })
                        .collect();
                    out.push('<');
                    out.push_str(&rendered.join(", "));
                    out.push('>');
                }
            }
            out
        }
        syn::Type::Array(a) => {
            let len = match &a.len {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Int(i),
                    ..
                }) => i.base10_digits().to_string(),
                _ => "_".to_string(),
            };
            format!("[{}; {len}]", describe_type(&a.elem))
        }
        syn::Type::Slice(s) => format!("[{}]", describe_type(&s.elem)),
        syn::Type::Reference(r) => {
            let m = if r.mutability.is_some() { "mut " } else { "" };
            format!("&{m}{}", describe_type(&r.elem))
        }
        syn::Type::Paren(p) => describe_type(&p.elem),
        syn::Type::Group(g) => describe_type(&g.elem),
        syn::Type::Tuple(t) => {
            let items: Vec<String> = t.elems.iter().map(describe_type).collect();
            format!("({})", items.join(", "))
        }
        syn::Type::Ptr(_) => "raw pointer".to_string(),
        syn::Type::TraitObject(_) => "trait object".to_string(),
        syn::Type::ImplTrait(_) => "impl trait".to_string(),
        syn::Type::BareFn(_) => "fn pointer".to_string(),
        _ => "type expression".to_string(),
    }
}
