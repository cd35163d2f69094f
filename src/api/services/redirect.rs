use std::sync::Arc;

use actix_web::http::{Method, StatusCode};
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::{debug, trace};

use crate::config::LinksConfig;
use crate::errors::INTERNAL_ERROR_MESSAGE;
use crate::services::{ClickAggregator, Resolution, Resolver};

/// 直接转发到前端的路径
const FRONTEND_PATHS: &[&str] = &["/", "/favicon.ico"];

/// 国家代码请求头（由 CDN 注入）
const COUNTRY_HEADER: &str = "CF-IPCountry";

/// 重定向所需的配置
#[derive(Debug, Clone)]
pub struct RedirectSettings {
    pub default_domain: String,
    pub web_base_url: String,
}

impl From<&LinksConfig> for RedirectSettings {
    fn from(config: &LinksConfig) -> Self {
        Self {
            default_domain: config.default_domain.clone(),
            web_base_url: config.web_base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl RedirectSettings {
    /// 请求 Host 等于默认域名时映射为空 host
    pub fn link_host<'a>(&self, request_host: &'a str) -> &'a str {
        if request_host.eq_ignore_ascii_case(&self.default_domain) {
            ""
        } else {
            request_host
        }
    }
}

pub struct RedirectService {}

impl RedirectService {
    pub async fn handle_redirect(
        req: HttpRequest,
        path: web::Path<String>,
        resolver: web::Data<Resolver>,
        clicks: web::Data<Arc<ClickAggregator>>,
        settings: web::Data<RedirectSettings>,
    ) -> HttpResponse {
        // 只接受 GET，不做任何查询；HEAD 探测不计点击
        if req.method() != Method::GET {
            return HttpResponse::MethodNotAllowed()
                .insert_header(("Allow", "GET"))
                .finish();
        }

        if FRONTEND_PATHS.contains(&req.path()) {
            return Self::found(&format!("{}{}", settings.web_base_url, req.path()));
        }

        let code = path.into_inner();
        if code.is_empty() {
            return Self::not_found_response(&settings);
        }

        let connection_info = req.connection_info();
        let host = settings.link_host(connection_info.host()).to_string();
        drop(connection_info);

        match resolver.resolve(&code, &host).await {
            Ok(Resolution::Redirect(destination)) => {
                let response = HttpResponse::build(StatusCode::MOVED_PERMANENTLY)
                    .insert_header(("Location", destination.as_str()))
                    .finish();
                Self::update_click(&req, &clicks, &code, &host);
                response
            }
            Ok(Resolution::Deleted) => {
                debug!("Redirect to deleted link '{}${}'", code, host);
                Self::found(&format!("{}/link-error/deleted", settings.web_base_url))
            }
            Ok(Resolution::NotFound) => {
                trace!("Redirect link not found: '{}${}'", code, host);
                Self::not_found_response(&settings)
            }
            // Resolver 已记录完整错误，这里只返回不透明文本
            Err(_) => Self::error_response(),
        }
    }

    /// 入队点击归因，不阻塞响应
    #[inline]
    fn update_click(req: &HttpRequest, clicks: &ClickAggregator, code: &str, host: &str) {
        clicks.attribute(
            code,
            host,
            header_value(req, "user-agent"),
            header_value(req, COUNTRY_HEADER),
        );
    }

    #[inline]
    fn found(location: &str) -> HttpResponse {
        HttpResponse::build(StatusCode::FOUND)
            .insert_header(("Location", location))
            .finish()
    }

    #[inline]
    fn not_found_response(settings: &RedirectSettings) -> HttpResponse {
        Self::found(&format!("{}/link-error/not-found", settings.web_base_url))
    }

    #[inline]
    fn error_response() -> HttpResponse {
        HttpResponse::build(StatusCode::INTERNAL_SERVER_ERROR)
            .insert_header(("Content-Type", "text/plain; charset=utf-8"))
            .body(INTERNAL_ERROR_MESSAGE)
    }
}

#[inline]
fn header_value<'a>(req: &'a HttpRequest, name: &str) -> &'a str {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
}

/// Redirect 路由配置
pub fn redirect_routes() -> actix_web::Scope {
    web::scope("").route("/{path:.*}", web::to(RedirectService::handle_redirect))
}
