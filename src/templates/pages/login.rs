use crate::domain::status::Role;
use crate::templates::desktop_layout;
use maud::{html, Markup};

pub fn login_page(error: Option<&str>) -> Markup {
    desktop_layout(
        "Sign in",
        None,
        html! {
            main class="container narrow" {
                h1 { "Sign in" }
                p class="lead" {
                    "Enter your name. New users pick a role on first sign-in."
                }

                @if let Some(msg) = error {
                    p class="error" { (msg) }
                }

                form method="post" action="/login" class="login" {
                    label for="name" { "Name" }
                    input type="text" id="name" name="name" autocomplete="username" required;

                    label for="role" { "Role (new users only)" }
                    select id="role" name="role" {
                        @for r in Role::ALL {
                            option value=(r.as_str()) selected[*r == Role::ApplicationOwner] { (r.label()) }
                        }
                    }

                    button type="submit" class="primary" { "Sign in" }
                }
            }
        },
    )
}
