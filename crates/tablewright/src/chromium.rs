//! Chromium control over the Chrome DevTools Protocol.
//!
//! With the `browser` feature, [`ChromiumDriver`] implements [`PageDriver`]
//! on top of chromiumoxide. Interactions are hit-tested in the page first so
//! that a click landing on an overlay is reported as intercepted instead of
//! silently clicking the overlay.
//!
//! [`PageDriver`]: crate::driver::PageDriver

use serde::{Deserialize, Serialize};

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a window
    pub headless: bool,
    /// Window width
    pub viewport_width: u32,
    /// Window height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// User agent string
    pub user_agent: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1366,
            viewport_height: 900,
            chromium_path: None,
            user_agent: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set user agent
    #[must_use]
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Script locating match `index` and hit-testing its centre
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn hit_test_script(element: &str) -> String {
    format!(
        r##"(() => {{
  const el = {element};
  if (!el) return {{ state: "missing" }};
  el.scrollIntoView({{ block: "center", inline: "center" }});
  const r = el.getBoundingClientRect();
  const style = window.getComputedStyle(el);
  if (r.width === 0 || r.height === 0 || style.visibility === "hidden" || style.display === "none") {{
    return {{ state: "hidden" }};
  }}
  const x = r.left + r.width / 2;
  const y = r.top + r.height / 2;
  const hit = document.elementFromPoint(x, y);
  if (hit && hit !== el && !el.contains(hit)) {{
    let by = hit.tagName.toLowerCase();
    if (hit.id) by += "#" + hit.id;
    if (typeof hit.className === "string" && hit.className.trim()) {{
      by += "." + hit.className.trim().split(/\s+/).join(".");
    }}
    return {{ state: "intercepted", by }};
  }}
  return {{ state: "ok", x, y }};
}})()"##
    )
}

/// Script selecting an `<option>` and firing `change` on its `<select>`
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn select_script(element: &str) -> String {
    format!(
        r#"(() => {{
  const option = {element};
  if (!option) return false;
  const select = option.closest("select");
  if (!select) return false;
  option.selected = true;
  select.dispatchEvent(new Event("change", {{ bubbles: true }}));
  return true;
}})()"#
    )
}

/// Script reporting whether the element is rendered with a non-empty box
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn visible_script(element: &str) -> String {
    format!(
        r#"(() => {{
  const el = {element};
  if (!el) return false;
  const r = el.getBoundingClientRect();
  const style = window.getComputedStyle(el);
  return r.width > 0 && r.height > 0 && style.visibility !== "hidden" && style.display !== "none";
}})()"#
    )
}

/// Script reading the label of a `<select>`'s chosen option
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn selected_label_script(select: &str) -> String {
    format!(
        r#"(() => {{
  const select = {select};
  if (!select || !select.selectedOptions.length) return null;
  return select.selectedOptions[0].textContent.trim();
}})()"#
    )
}

/// Outcome of [`hit_test_script`]
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
enum HitTest {
    Missing,
    Hidden,
    Intercepted { by: String },
    Ok { x: f64, y: f64 },
}

#[cfg(feature = "browser")]
#[allow(clippy::significant_drop_tightening)]
mod cdp {
    use super::{hit_test_script, select_script, selected_label_script, visible_script, BrowserConfig, HitTest};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::layout::Point;
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use tokio::sync::Mutex;
    use tracing::{debug, info};

    use crate::driver::{Action, PageDriver};
    use crate::locator::Locator;
    use crate::result::{EngineError, EngineResult};
    use crate::wait::Condition;

    fn page_error(e: impl std::fmt::Display) -> EngineError {
        EngineError::PageError {
            message: e.to_string(),
        }
    }

    /// [`PageDriver`] backed by a launched Chromium
    #[derive(Debug)]
    pub struct ChromiumDriver {
        browser: Mutex<CdpBrowser>,
        page: CdpPage,
        handle: tokio::task::JoinHandle<()>,
    }

    impl ChromiumDriver {
        /// Launch Chromium and open a blank page
        pub async fn launch(config: &BrowserConfig) -> EngineResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height);
            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }
            if let Some(ref ua) = config.user_agent {
                builder = builder.arg(format!("--user-agent={ua}"));
            }
            let cdp_config = builder
                .build()
                .map_err(|message| EngineError::BrowserLaunchError { message })?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
                EngineError::BrowserLaunchError {
                    message: e.to_string(),
                }
            })?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let page = browser.new_page("about:blank").await.map_err(page_error)?;
            info!(headless = config.headless, "chromium launched");
            Ok(Self {
                browser: Mutex::new(browser),
                page,
                handle,
            })
        }

        async fn eval<T: DeserializeOwned>(&self, script: String) -> EngineResult<T> {
            self.page
                .evaluate(script)
                .await
                .map_err(page_error)?
                .into_value()
                .map_err(page_error)
        }

        async fn hit_test(&self, locator: &Locator, index: usize) -> EngineResult<(f64, f64)> {
            match self.eval(hit_test_script(&locator.to_query(index))).await? {
                HitTest::Ok { x, y } => Ok((x, y)),
                HitTest::Missing => Err(EngineError::ElementNotFound {
                    locator: locator.to_string(),
                    index,
                }),
                HitTest::Hidden => Err(EngineError::NotInteractable {
                    locator: locator.to_string(),
                    index,
                }),
                HitTest::Intercepted { by } => Err(EngineError::Intercepted {
                    locator: locator.to_string(),
                    by,
                }),
            }
        }
    }

    #[async_trait]
    impl PageDriver for ChromiumDriver {
        async fn navigate(&mut self, url: &str) -> EngineResult<()> {
            self.page
                .goto(url)
                .await
                .map_err(|e| EngineError::NavigationError {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn content(&self) -> EngineResult<String> {
            self.page.content().await.map_err(page_error)
        }

        async fn interact(&self, locator: &Locator, index: usize, action: Action) -> EngineResult<()> {
            if action == Action::Select {
                let selected: bool = self.eval(select_script(&locator.to_query(index))).await?;
                if !selected {
                    return Err(EngineError::ElementNotFound {
                        locator: locator.to_string(),
                        index,
                    });
                }
                return Ok(());
            }
            let (x, y) = self.hit_test(locator, index).await?;
            debug!(%locator, index, x, y, %action, "cdp input");
            let point = Point::new(x, y);
            match action {
                Action::Hover => self.page.move_mouse(point).await.map_err(page_error)?,
                _ => self.page.click(point).await.map_err(page_error)?,
            };
            Ok(())
        }

        async fn current_url(&self) -> EngineResult<String> {
            Ok(self.page.url().await.map_err(page_error)?.unwrap_or_default())
        }

        async fn close(&mut self) -> EngineResult<()> {
            self.browser
                .get_mut()
                .close()
                .await
                .map_err(|e| EngineError::BrowserLaunchError {
                    message: e.to_string(),
                })?;
            self.handle.abort();
            Ok(())
        }

        async fn count(&self, locator: &Locator) -> EngineResult<usize> {
            self.eval(locator.to_count_query()).await
        }

        async fn is_visible(&self, locator: &Locator, index: usize) -> EngineResult<bool> {
            self.eval(visible_script(&locator.to_query(index))).await
        }

        async fn check(&self, condition: &Condition) -> EngineResult<bool> {
            match condition {
                Condition::Present(locator) => Ok(self.count(locator).await? > 0),
                Condition::Visible(locator) => self.is_visible(locator, 0).await,
                Condition::Hidden(locator) => Ok(!self.is_visible(locator, 0).await?),
                Condition::Selected { select, label } => {
                    let shown: Option<String> =
                        self.eval(selected_label_script(&select.to_query(0))).await?;
                    Ok(shown.as_deref() == Some(label.as_str()))
                }
            }
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::ChromiumDriver;
