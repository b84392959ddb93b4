//! Compose and NGINX file generation.
//!
//! Rendering performs no I/O and is byte-for-byte deterministic for a given
//! site name. Image tags, database credentials and the published host port
//! are fixed; two sites started at once will both try to bind port 80.

use crate::site::SiteName;
use serde::Serialize;

pub const HOSTS_ADDRESS: &str = "127.0.0.1";
pub const MYSQL_IMAGE: &str = "mysql:latest";
pub const WORDPRESS_IMAGE: &str = "wordpress:latest";
pub const HOST_PORT: u16 = 80;

const COMPOSE_TEMPLATE: &str = "version: '3'
services:
  db:
    image: mysql:latest
    restart: always
    environment:
      MYSQL_DATABASE: wordpress
      MYSQL_USER: wordpress
      MYSQL_PASSWORD: wordpress
      MYSQL_RANDOM_ROOT_PASSWORD: '1'
    volumes:
      - db_data:/var/lib/mysql
  wordpress:
    depends_on:
      - db
    image: wordpress:latest
    restart: always
    environment:
      WORDPRESS_DB_HOST: db:3306
      WORDPRESS_DB_USER: wordpress
      WORDPRESS_DB_PASSWORD: wordpress
    ports:
      - \"80:80\"
    volumes:
      - ./wp-content:/var/www/html/wp-content
volumes:
  db_data:
";

/// Generated file contents for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteArtifacts {
    pub compose: String,
    pub nginx: String,
}

pub fn render(name: &SiteName) -> SiteArtifacts {
    SiteArtifacts {
        compose: render_compose(),
        nginx: render_nginx(name),
    }
}

pub fn render_compose() -> String {
    COMPOSE_TEMPLATE.to_owned()
}

pub fn render_nginx(name: &SiteName) -> String {
    format!(
        r"server {{
    listen 80;
    server_name {name};

    location / {{
        proxy_pass http://wordpress:80;
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
    }}
}}
"
    )
}

/// The hosts-file line mapping `name` to the loopback address.
pub fn hosts_line(name: &SiteName) -> String {
    format!("{HOSTS_ADDRESS} {name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> SiteName {
        SiteName::parse("demo").unwrap()
    }

    #[test]
    fn nginx_uses_site_name_as_server_name() {
        let out = render(&demo());
        assert!(out.nginx.contains("server_name demo;"));
        assert!(out.nginx.contains("proxy_pass http://wordpress:80;"));
        assert!(out.nginx.contains("proxy_set_header X-Forwarded-Proto $scheme;"));
    }

    #[test]
    fn compose_pins_images_and_port() {
        let out = render(&demo());
        assert!(out.compose.contains(&format!("image: {MYSQL_IMAGE}")));
        assert!(out.compose.contains(&format!("image: {WORDPRESS_IMAGE}")));
        assert!(out.compose.contains(&format!("\"{HOST_PORT}:80\"")));
        assert!(out.compose.contains("WORDPRESS_DB_HOST: db:3306"));
        assert!(out.compose.ends_with("db_data:\n"));
    }

    #[test]
    fn rendering_is_deterministic() {
        assert_eq!(render(&demo()), render(&demo()));
    }

    #[test]
    fn nginx_differs_only_by_name() {
        let other = SiteName::parse("blog.local").unwrap();
        let a = render_nginx(&demo());
        let b = render_nginx(&other);
        assert_ne!(a, b);
        assert_eq!(a.replace("demo", "blog.local"), b);
    }

    #[test]
    fn nginx_braces_are_balanced() {
        let nginx = render_nginx(&demo());
        let open = nginx.matches('{').count();
        let close = nginx.matches('}').count();
        assert_eq!(open, 2);
        assert_eq!(open, close);
    }

    #[test]
    fn hosts_line_maps_loopback() {
        assert_eq!(hosts_line(&demo()), "127.0.0.1 demo");
    }
}
