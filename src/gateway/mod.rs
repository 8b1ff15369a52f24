//! Dashboard gateway.
//!
//! Serves the embedded dashboard and a small JSON API. Site operations are
//! forwarded to the provisioning service named in the stored settings;
//! title generation goes to an OpenAI-compatible endpoint.
//!
//! | Module     | Responsibility                                          |
//! |------------|---------------------------------------------------------|
//! | `server`   | Router assembly, token resolution, listener             |
//! | `api`      | `/api/*` handlers and `ApiError`                        |
//! | `settings` | `SettingsStore`: JSON file, masking, merge-on-save      |
//! | `upstream` | `ProvisionerClient` (reqwest)                           |
//! | `llm`      | `ContentGenerator` and title parsing                    |
//! | `embedded` | Dashboard assets via `rust-embed`, SPA fallback         |

pub mod api;
pub mod embedded;
pub mod llm;
pub mod server;
pub mod settings;
pub mod upstream;
