pub mod config {
    use serde::Deserialize;

    /// Which object store holds the task data.
    #[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[serde(rename_all = "lowercase")]
    pub enum StorageBackend {
        /// Amazon S3 or an S3-compatible service.
        #[default]
        S3,
        /// Process-local memory, for development and tests.
        Memory,
    }

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        #[serde(default)]
        pub bucket_name: Option<String>,
        #[serde(default = "default_port")]
        pub port: u16,
        #[serde(default)]
        pub storage_backend: StorageBackend,
        #[serde(default)]
        pub aws_region: Option<String>,
        #[serde(default)]
        pub aws_endpoint: Option<String>,
        #[serde(default)]
        pub aws_allow_http: bool,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(config::Environment::default())
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Configuration for a server backed by the in-memory store.
        pub fn in_memory(port: u16) -> Self {
            Config {
                bucket_name: None,
                port,
                storage_backend: StorageBackend::Memory,
                aws_region: None,
                aws_endpoint: None,
                aws_allow_http: false,
            }
        }
    }

    fn default_port() -> u16 {
        8080
    }

}
pub mod storage;
pub mod task;
pub mod task_list;
pub mod web;
