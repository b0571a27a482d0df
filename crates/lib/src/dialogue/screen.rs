//! Screens the dispatcher can show and the button ids that lead to them.

/// One menu screen or content block. Each maps to a catalog entry by [`Screen::key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Welcome,
    MainMenu,
    SimpleMenu,
    ServicesMenu,
    ExpressService,
    BasicService,
    FleteService,
    QuoteExpress,
    QuoteBasic,
    QuoteFlete,
    QuoteReceived,
    AdvisorContact,
    SocialNetworks,
    Schedule,
    Location,
    InfoMenu,
    MapsLink,
    DirectCall,
    MovingTips,
    PlanningTips,
    PackingTips,
    MovingDayTips,
    MediaReceived,
    Error,
}

/// Moving service a quote request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceType {
    Express,
    Basic,
    Flete,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Express => "express",
            ServiceType::Basic => "basic",
            ServiceType::Flete => "flete",
        }
    }
}

impl Screen {
    pub const ALL: [Screen; 24] = [
        Screen::Welcome,
        Screen::MainMenu,
        Screen::SimpleMenu,
        Screen::ServicesMenu,
        Screen::ExpressService,
        Screen::BasicService,
        Screen::FleteService,
        Screen::QuoteExpress,
        Screen::QuoteBasic,
        Screen::QuoteFlete,
        Screen::QuoteReceived,
        Screen::AdvisorContact,
        Screen::SocialNetworks,
        Screen::Schedule,
        Screen::Location,
        Screen::InfoMenu,
        Screen::MapsLink,
        Screen::DirectCall,
        Screen::MovingTips,
        Screen::PlanningTips,
        Screen::PackingTips,
        Screen::MovingDayTips,
        Screen::MediaReceived,
        Screen::Error,
    ];

    /// Catalog key for this screen.
    pub fn key(&self) -> &'static str {
        match self {
            Screen::Welcome => "welcome",
            Screen::MainMenu => "main_menu",
            Screen::SimpleMenu => "simple_menu",
            Screen::ServicesMenu => "services_menu",
            Screen::ExpressService => "express_service",
            Screen::BasicService => "basic_service",
            Screen::FleteService => "flete_service",
            Screen::QuoteExpress => "quote_express",
            Screen::QuoteBasic => "quote_basic",
            Screen::QuoteFlete => "quote_flete",
            Screen::QuoteReceived => "quote_received",
            Screen::AdvisorContact => "advisor_contact",
            Screen::SocialNetworks => "social_networks",
            Screen::Schedule => "schedule",
            Screen::Location => "location",
            Screen::InfoMenu => "info_menu",
            Screen::MapsLink => "maps_link",
            Screen::DirectCall => "direct_call",
            Screen::MovingTips => "moving_tips",
            Screen::PlanningTips => "planning_tips",
            Screen::PackingTips => "packing_tips",
            Screen::MovingDayTips => "moving_day_tips",
            Screen::MediaReceived => "media_received",
            Screen::Error => "error",
        }
    }

    /// Screen a reply button leads to. `None` for ids no menu emits; callers fall back to the main menu.
    pub fn from_button_id(id: &str) -> Option<Screen> {
        let screen = match id {
            "services" | "back_services" => Screen::ServicesMenu,
            "express_service" => Screen::ExpressService,
            "basic_service" => Screen::BasicService,
            "flete_service" => Screen::FleteService,
            "quote_express" => Screen::QuoteExpress,
            "quote_basic" => Screen::QuoteBasic,
            "quote_flete" => Screen::QuoteFlete,
            "back" | "back_main" => Screen::MainMenu,
            "call_advisor" => Screen::AdvisorContact,
            "social_networks" => Screen::SocialNetworks,
            "schedule_info" => Screen::Schedule,
            "location_info" => Screen::Location,
            "info" | "back_info" => Screen::InfoMenu,
            "open_maps" => Screen::MapsLink,
            "call_direct" => Screen::DirectCall,
            "moving_tips" => Screen::MovingTips,
            "planning_tips" => Screen::PlanningTips,
            "packing_tips" => Screen::PackingTips,
            "moving_day_tips" => Screen::MovingDayTips,
            _ => return None,
        };
        Some(screen)
    }

    /// Quote form screens open a quote intake for their service.
    pub fn quote_service(&self) -> Option<ServiceType> {
        match self {
            Screen::QuoteExpress => Some(ServiceType::Express),
            Screen::QuoteBasic => Some(ServiceType::Basic),
            Screen::QuoteFlete => Some(ServiceType::Flete),
            _ => None,
        }
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
