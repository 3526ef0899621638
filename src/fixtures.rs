#[cfg(test)]
pub mod test {
    use confique::Config;
    use serde::{Deserialize, Serialize};

    use crate::schema::{Field, Schema, Section};

    /// Schema shared by most unit tests.
    pub fn test_schema() -> Schema {
        Schema::builder()
            .comment("Test application settings")
            .field(
                Field::string("host")
                    .default("localhost")
                    .comment("The application host.")
                    .auto_environ(),
            )
            .field(
                Field::integer("port")
                    .default(8080)
                    .comment("The port number.")
                    .auto_environ(),
            )
            .field(Field::float("rate").default(1.5))
            .field(Field::boolean("debug").default(false).comment("Enable debug mode."))
            .field(Field::list("tags").default(vec!["a", "b"]))
            .section(
                Section::new("database")
                    .comment("Database settings.")
                    .field(
                        Field::string("url")
                            .comment("Connection string URL.")
                            .environ("DATABASE_URL"),
                    )
                    .field(Field::integer("pool_size").default(5)),
            )
            .section(
                Section::new("sub")
                    .field(Field::string("nested").default("Default").auto_global())
                    .section(Section::new("deeper").field(Field::float("level").default(2.2))),
            )
            .build()
            .expect("test schema is valid")
    }

    /// Derived counterpart used by the confique bridge tests.
    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct DerivedConfig {
        /// The application host.
        #[config(default = "localhost")]
        pub host: String,

        /// The port number.
        #[config(default = 8080)]
        pub port: u16,

        /// Enable debug mode.
        #[config(default = false)]
        pub debug: bool,

        /// Database settings.
        #[config(nested)]
        pub database: DerivedDbConfig,
    }

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct DerivedDbConfig {
        /// Connection string URL.
        #[config(env = "DATABASE_URL")]
        pub url: Option<String>,

        /// Connection pool size.
        #[config(default = 5)]
        pub pool_size: usize,
    }

    #[test]
    fn test_schema_builds() {
        assert_eq!(test_schema().leaves().len(), 9);
    }

    #[test]
    fn derived_config_loads_defaults() {
        let config = DerivedConfig::builder().load().unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database.pool_size, 5);
    }
}
