use axum::http::{HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsConfig;

/// 配置列表解析结果：是否出现 "*"，以及其余合法值。
struct Parsed<T> {
    any: bool,
    values: Vec<T>,
}

/// 根据配置构建 CORS 中间件。
///
/// 默认配置返回 `Access-Control-Allow-Origin: *`。
pub fn build_cors_layer(cors: &CorsConfig) -> Option<CorsLayer> {
    if !cors.enabled {
        return None;
    }

    let origins = parse_list("allowed_origins", &cors.allowed_origins, |v| {
        HeaderValue::from_str(v).ok()
    });
    if !origins.any && origins.values.is_empty() {
        tracing::warn!("CORS 已启用但 allowed_origins 为空，已跳过启用");
        return None;
    }
    let methods = parse_list("allowed_methods", &cors.allowed_methods, |v| {
        Method::from_bytes(v.to_ascii_uppercase().as_bytes()).ok()
    });
    let headers = parse_list("allowed_headers", &cors.allowed_headers, |v| {
        HeaderName::from_bytes(v.to_ascii_lowercase().as_bytes()).ok()
    });

    let mut layer = CorsLayer::new();
    layer = if origins.any {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins.values)
    };

    if methods.any {
        layer = layer.allow_methods(Any);
    } else if !methods.values.is_empty() {
        layer = layer.allow_methods(methods.values);
    }

    if headers.any {
        layer = layer.allow_headers(Any);
    } else if !headers.values.is_empty() {
        layer = layer.allow_headers(headers.values);
    }

    if let Some(secs) = cors.max_age_secs
        && secs > 0
    {
        layer = layer.max_age(Duration::from_secs(secs));
    }

    Some(layer)
}

fn parse_list<T>(label: &str, raw: &[String], parse: impl Fn(&str) -> Option<T>) -> Parsed<T> {
    let mut out = Parsed {
        any: false,
        values: Vec::new(),
    };
    for value in raw.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if value == "*" {
            out.any = true;
            continue;
        }
        match parse(value) {
            Some(v) => out.values.push(v),
            None => tracing::warn!("CORS {} 含无效值: {}", label, value),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{build_cors_layer, parse_list};
    use crate::config::CorsConfig;
    use axum::http::Method;

    #[test]
    fn disabled_config_builds_nothing() {
        let cors = CorsConfig {
            enabled: false,
            ..CorsConfig::default()
        };
        assert!(build_cors_layer(&cors).is_none());
    }

    #[test]
    fn skips_when_origins_empty() {
        let cors = CorsConfig {
            allowed_origins: vec![" ".to_string()],
            ..CorsConfig::default()
        };
        assert!(build_cors_layer(&cors).is_none());
    }

    #[test]
    fn method_list_normalizes_case_and_detects_wildcard() {
        let input = vec!["get".to_string(), " head ".to_string(), "*".to_string()];
        let parsed = parse_list("allowed_methods", &input, |v| {
            Method::from_bytes(v.to_ascii_uppercase().as_bytes()).ok()
        });
        assert!(parsed.any);
        assert_eq!(parsed.values, vec![Method::GET, Method::HEAD]);
    }
}
