//! Declarative table of API endpoints.
//!
//! Every domain operation is a row: HTTP method, path template and the shape
//! the response body is expected to have. Templates are relative to the base
//! URL and use `{app}`, `{type}` and `{id}` placeholders.

use crate::error::{ApiError, ApiResult};
use crate::http::HttpMethod;
use crate::record::Shape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    CreateApp,
    ListApps,
    AppRegister,
    Register,
    AppLogin,
    Login,
    CreateItem,
    GetItem,
    UpdateItem,
    DeleteItem,
    ListItems,
    ListCollections,
}

/// One row of the endpoint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub method: HttpMethod,
    pub template: &'static str,
    pub shape: Shape,
}

const fn route(method: HttpMethod, template: &'static str, shape: Shape) -> Route {
    Route {
        method,
        template,
        shape,
    }
}

impl Endpoint {
    pub const ALL: [Endpoint; 12] = [
        Endpoint::CreateApp,
        Endpoint::ListApps,
        Endpoint::AppRegister,
        Endpoint::Register,
        Endpoint::AppLogin,
        Endpoint::Login,
        Endpoint::CreateItem,
        Endpoint::GetItem,
        Endpoint::UpdateItem,
        Endpoint::DeleteItem,
        Endpoint::ListItems,
        Endpoint::ListCollections,
    ];

    pub const fn route(self) -> Route {
        use HttpMethod::*;
        use Shape::*;

        match self {
            Endpoint::CreateApp => route(Post, "app", Single),
            Endpoint::ListApps => route(Get, "app", Collection),
            Endpoint::AppRegister => route(Post, "app/{app}/register", Single),
            Endpoint::Register => route(Post, "register", Single),
            Endpoint::AppLogin => route(Post, "app/{app}/login", Single),
            Endpoint::Login => route(Post, "login", Single),
            Endpoint::CreateItem => route(Post, "app/{app}/data/{type}", Single),
            Endpoint::GetItem => route(Get, "app/{app}/data/{type}/{id}", Single),
            Endpoint::UpdateItem => route(Put, "app/{app}/data/{type}/{id}", Single),
            Endpoint::DeleteItem => route(Delete, "app/{app}/data/{type}/{id}", Single),
            Endpoint::ListItems => route(Get, "app/{app}/data/{type}", Collection),
            Endpoint::ListCollections => route(Get, "app/{app}/data", Names),
        }
    }

    /// Render the path template with `params`.
    ///
    /// Fails with `ApiError::Construction` when the template needs a record
    /// type or id that was not supplied.
    pub fn path(self, params: &PathParams<'_>) -> ApiResult<String> {
        let template = self.route().template;
        let mut out = String::with_capacity(template.len() + 32);
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let end = rest[start..]
                .find('}')
                .map(|i| start + i)
                .ok_or_else(|| ApiError::Construction(format!("unterminated placeholder in `{template}`")))?;
            let value = match &rest[start + 1..end] {
                "app" => Some(params.app),
                "type" => params.record_type,
                "id" => params.id,
                other => {
                    return Err(ApiError::Construction(format!("unknown placeholder `{other}` in `{template}`")));
                }
            };
            let value =
                value.ok_or_else(|| ApiError::Construction(format!("{self:?} needs `{}`", &rest[start + 1..end])))?;
            out.push_str(value);
            rest = &rest[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Values substituted into a path template.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathParams<'a> {
    pub app: &'a str,
    pub record_type: Option<&'a str>,
    pub id: Option<&'a str>,
}

impl<'a> PathParams<'a> {
    pub fn app(app: &'a str) -> Self {
        Self {
            app,
            record_type: None,
            id: None,
        }
    }

    pub fn with_type(mut self, record_type: &'a str) -> Self {
        self.record_type = Some(record_type);
        self
    }

    pub fn with_id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }
}
