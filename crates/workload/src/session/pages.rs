//! Shopping app screens and the navigation graph between them.

use crate::distribution::WeightedTable;
use clickstream_types::Platform;
use std::fmt;

const ANDROID_PACKAGE: &str = "com.example.shopping";
const IOS_MODULE: &str = "Shopping";
const WEB_HOST: &str = "https://shop.example.com";

/// A screen of the shopping app, plus the terminal `Exit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Login,
    Signup,
    Main,
    Category,
    Search,
    Detail,
    Cart,
    Checkout,
    Result,
    Profile,
    Live,
    Exit,
}

impl Page {
    /// Every page that has a screen, in table order.
    pub const SCREENS: [Page; 11] = [
        Page::Login,
        Page::Signup,
        Page::Main,
        Page::Category,
        Page::Search,
        Page::Detail,
        Page::Cart,
        Page::Checkout,
        Page::Result,
        Page::Profile,
        Page::Live,
    ];

    fn index(self) -> Option<usize> {
        Page::SCREENS.iter().position(|&p| p == self)
    }

    /// Short page name used in payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Page::Login => "login",
            Page::Signup => "signup",
            Page::Main => "main",
            Page::Category => "category",
            Page::Search => "search",
            Page::Detail => "detail",
            Page::Cart => "cart",
            Page::Checkout => "checkout",
            Page::Result => "result",
            Page::Profile => "profile",
            Page::Live => "live",
            Page::Exit => "exit",
        }
    }

    fn screen_stem(self) -> &'static str {
        match self {
            Page::Login => "Login",
            Page::Signup => "Signup",
            Page::Main => "Main",
            Page::Category => "Category",
            Page::Search => "Search",
            Page::Detail => "ProductDetail",
            Page::Cart => "ShoppingCart",
            Page::Checkout => "Checkout",
            Page::Result => "BuyResult",
            Page::Profile => "Profile",
            Page::Live => "Live",
            Page::Exit => "Splash",
        }
    }

    fn web_page(self) -> (&'static str, &'static str) {
        match self {
            Page::Login => ("loginPage", "/login"),
            Page::Signup => ("signupPage", "/signup"),
            Page::Main | Page::Exit => ("indexPage", "/"),
            Page::Category => ("categoryPage", "/category"),
            Page::Search => ("searchPage", "/search"),
            Page::Detail => ("productPage", "/product"),
            Page::Cart => ("cartPage", "/cart"),
            Page::Checkout => ("checkoutPage", "/checkout"),
            Page::Result => ("resultPage", "/result"),
            Page::Profile => ("profilePage", "/profile"),
            Page::Live => ("livePage", "/live"),
        }
    }

    /// Platform-specific screen name and screen id.
    ///
    /// Android uses activity classes, iOS view controllers and web page URLs.
    pub fn screen(self, platform: Platform) -> (String, String) {
        match platform {
            Platform::Android => {
                let name = format!("{}Activity", self.screen_stem());
                let id = format!("{}.{}", ANDROID_PACKAGE, name);
                (name, id)
            }
            Platform::IOS => {
                let name = format!("{}VC", self.screen_stem());
                let id = format!("{}.{}", IOS_MODULE, name);
                (name, id)
            }
            Platform::Web => {
                let (name, path) = self.web_page();
                (name.to_string(), format!("{}{}", WEB_HOST, path))
            }
        }
    }

    /// Outgoing edges of the navigation graph with their weights.
    fn transitions(self) -> &'static [(Page, u32)] {
        use Page::*;
        match self {
            Login => &[(Main, 93), (Signup, 6), (Exit, 1)],
            Signup => &[(Main, 70), (Login, 20), (Exit, 10)],
            Main => &[
                (Search, 12),
                (Category, 18),
                (Live, 25),
                (Detail, 43),
                (Cart, 12),
                (Profile, 6),
                (Exit, 1),
            ],
            Category => &[
                (Search, 12),
                (Detail, 45),
                (Main, 20),
                (Profile, 5),
                (Cart, 16),
                (Exit, 1),
            ],
            Search => &[(Category, 12), (Main, 15), (Detail, 30), (Exit, 1)],
            Detail => &[
                (Search, 5),
                (Detail, 15),
                (Category, 17),
                (Main, 20),
                (Cart, 10),
                (Checkout, 3),
                (Exit, 1),
            ],
            Cart => &[
                (Main, 25),
                (Category, 21),
                (Detail, 10),
                (Checkout, 5),
                (Profile, 16),
                (Exit, 1),
            ],
            Checkout => &[(Cart, 25), (Result, 20), (Exit, 1)],
            Result => &[(Main, 40), (Profile, 40), (Exit, 1)],
            Profile => &[(Main, 20), (Category, 20), (Cart, 15), (Login, 5), (Exit, 1)],
            Live => &[(Main, 20), (Detail, 80), (Exit, 1)],
            Exit => &[],
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weighted next-page tables for every screen.
#[derive(Clone, Debug)]
pub struct NavigationGraph {
    tables: Vec<WeightedTable<Page>>,
}

impl NavigationGraph {
    /// Graph with the shopping app's navigation weights.
    pub fn shopping() -> Self {
        let tables = Page::SCREENS
            .iter()
            .filter_map(|page| WeightedTable::new(page.transitions().to_vec()))
            .collect();
        Self { tables }
    }

    /// Draw the page that follows `page`. `Exit` is absorbing.
    pub fn next<R: rand::Rng + ?Sized>(&self, page: Page, rng: &mut R) -> Page {
        match page.index().and_then(|i| self.tables.get(i)) {
            Some(table) => *table.sample(rng),
            None => Page::Exit,
        }
    }
}

impl Default for NavigationGraph {
    fn default() -> Self {
        Self::shopping()
    }
}
