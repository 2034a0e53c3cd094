//! Live catalog access over HTTP.
use async_trait::async_trait;
use std::time::Duration;

use dexcatch_game::{CatalogEntry, CatalogError, CatalogSource, SpeciesEntry, creature_url};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`CatalogSource`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base: String,
}

impl HttpCatalog {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dexcatch-tester/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    async fn get_text(&self, url: &str) -> Result<String, CatalogError> {
        log::debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| CatalogError::Network(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            log::warn!("catalog request {url} returned {status}");
            return Err(CatalogError::Status(status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|err| CatalogError::Network(err.to_string()))
    }
}

#[async_trait(?Send)]
impl CatalogSource for HttpCatalog {
    async fn creature(&self, id: u32) -> Result<CatalogEntry, CatalogError> {
        let body = match self.get_text(&creature_url(&self.base, id)).await {
            Err(CatalogError::Status(404)) => return Err(CatalogError::NotFound(id)),
            other => other?,
        };
        CatalogEntry::from_json(&body)
    }

    async fn species(&self, entry: &CatalogEntry) -> Result<SpeciesEntry, CatalogError> {
        let url = entry
            .species_url()
            .ok_or_else(|| CatalogError::Decode(format!("creature {} has no species link", entry.id)))?;
        let body = self.get_text(url).await?;
        SpeciesEntry::from_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_is_normalised() {
        let catalog = HttpCatalog::new("http://127.0.0.1:9/api/v2/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(catalog.base(), "http://127.0.0.1:9/api/v2");
    }

    #[test]
    fn unreachable_host_is_a_network_error() {
        let catalog =
            HttpCatalog::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = runtime.block_on(catalog.creature(1)).unwrap_err();
        assert!(matches!(err, CatalogError::Network(_)));
    }

    mod mock {
        use super::*;
        use hyper::header::HOST;
        use hyper::service::{make_service_fn, service_fn};
        use hyper::{Body, Request, Response, Server, StatusCode};
        use std::convert::Infallible;
        use std::net::SocketAddr;

        async fn serve(req: Request<Body>) -> Result<Response<Body>, Infallible> {
            let host = req
                .headers()
                .get(HOST)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("127.0.0.1")
                .to_string();
            let body = match req.uri().path() {
                "/pokemon/25" => format!(
                    r#"{{"id":25,"name":"pikachu","base_experience":112,
                        "sprites":{{"front_default":"http://{host}/25.png","front_shiny":null}},
                        "types":[{{"slot":1,"type":{{"name":"electric","url":""}}}}],
                        "species":{{"name":"pikachu","url":"http://{host}/pokemon-species/25"}}}}"#
                ),
                "/pokemon/26" => r#"{"id":26,"name":"raichu","types":[]}"#.to_string(),
                "/pokemon/27" => "<html>oops</html>".to_string(),
                "/pokemon-species/25" => r#"{"is_legendary":false,"is_mythical":false}"#.to_string(),
                _ => {
                    let mut response = Response::new(Body::empty());
                    *response.status_mut() = StatusCode::NOT_FOUND;
                    return Ok(response);
                }
            };
            Ok(Response::new(Body::from(body)))
        }

        fn spawn_catalog() -> SocketAddr {
            let make = make_service_fn(|_| async { Ok::<_, Infallible>(service_fn(serve)) });
            let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make);
            let addr = server.local_addr();
            tokio::spawn(server);
            addr
        }

        #[tokio::test]
        async fn fetches_creature_and_linked_species() {
            let addr = spawn_catalog();
            let catalog = HttpCatalog::new(&format!("http://{addr}/"), DEFAULT_TIMEOUT).unwrap();

            let entry = catalog.creature(25).await.unwrap();
            assert_eq!(entry.name, "pikachu");
            assert_eq!(entry.type_names(), vec!["electric".to_string()]);
            assert!(entry.sprites.front_shiny.is_none());

            let species = catalog.species(&entry).await.unwrap();
            assert!(!species.is_legendary);
        }

        #[tokio::test]
        async fn maps_missing_links_statuses_and_bad_bodies() {
            let addr = spawn_catalog();
            let catalog = HttpCatalog::new(&format!("http://{addr}"), DEFAULT_TIMEOUT).unwrap();

            let orphan = catalog.creature(26).await.unwrap();
            assert!(matches!(
                catalog.species(&orphan).await,
                Err(CatalogError::Decode(_))
            ));
            assert!(matches!(
                catalog.creature(27).await,
                Err(CatalogError::Decode(_))
            ));
            assert_eq!(
                catalog.creature(9999).await.unwrap_err(),
                CatalogError::NotFound(9999)
            );
        }
    }
}
