//! The personalized greeting on the dashboard.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use rand::seq::SliceRandom;

use crate::db::social::ActivityStats;

const ONBOARDING: &[&str] = &[
    "Welcome to CUR8tr! Let's create your recommendation profile.",
    "Ready to start curating? Your recommendation journey begins here.",
    "Time to share what you love! Create your first curated list.",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeMessage {
    pub greeting: String,
    pub activity: String,
    pub suggestion: String,
    pub milestone: String,
}

fn time_greeting(hour: u32) -> &'static str {
    match hour {
        5..=9 => "Good morning",
        10..=11 => "Morning",
        12..=14 => "Good afternoon",
        15..=16 => "Afternoon",
        17..=21 => "Good evening",
        22..=23 => "Working late",
        _ => "Up early",
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Build the greeting for `username` at local time `now`. `stats` is None
/// until the user has a profile.
pub fn welcome_message(
    username: &str,
    stats: Option<&ActivityStats>,
    now: NaiveDateTime,
) -> WelcomeMessage {
    let greeting = format!("{}, {}!", time_greeting(now.hour()), username);

    let Some(s) = stats else {
        let activity = ONBOARDING
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(ONBOARDING[0]);
        return WelcomeMessage {
            greeting,
            activity: activity.to_string(),
            suggestion: "Start by setting up your profile and adding categories for things you're passionate about.".to_string(),
            milestone: String::new(),
        };
    };

    let (activity, mut suggestion) = if s.recommendations == 0 {
        if s.categories == 0 {
            (
                "Welcome to CUR8tr! Let's start building your first curated list.".to_string(),
                "Create a category for something you're passionate about - books, restaurants, apps, or anything!".to_string(),
            )
        } else {
            (
                format!(
                    "You've set up {} categories. Time to add your first recommendation!",
                    s.categories
                ),
                "Pick your favorite category and share something you genuinely love.".to_string(),
            )
        }
    } else if s.recommendations < 5 {
        let engagement = if s.likes > 0 {
            format!(" with {} likes!", s.likes)
        } else {
            String::new()
        };
        let suggestion = if s.with_tips == 0 {
            "Try adding a 'Pro Tip' to your next recommendation - share insider knowledge!"
        } else if s.with_tags == 0 {
            "Add tags to your recommendations to help organize them by themes or collections."
        } else {
            "Keep the momentum going - your curated lists are becoming valuable resources."
        };
        (
            format!(
                "Great progress! {} recommendation{}{}",
                s.recommendations,
                plural(s.recommendations),
                engagement
            ),
            suggestion.to_string(),
        )
    } else if s.recommendations < 15 {
        let quality = s.with_tips as f64 / s.recommendations as f64;
        let suggestion = if quality < 0.3 {
            "Consider adding Pro Tips to more recommendations - they make your advice extra valuable!".to_string()
        } else if s.followers == 0 {
            "Your profile is looking great! Share your unique URL with friends to start building followers.".to_string()
        } else {
            format!(
                "You're gaining traction with {} followers. Keep sharing quality recommendations!",
                s.followers
            )
        };
        (
            format!(
                "Excellent! {} recommendations across {} categories.",
                s.recommendations, s.categories
            ),
            suggestion,
        )
    } else {
        let level = if s.recommendations >= 30 {
            "curator extraordinaire"
        } else {
            "curation expert"
        };
        let suggestion = if s.comments > 20 {
            format!(
                "Your recommendations are sparking conversations! {} comments show real engagement.",
                s.comments
            )
        } else if s.followers > 5 {
            format!(
                "Your influence is growing - {} followers trust your recommendations.",
                s.followers
            )
        } else {
            "Consider sharing your profile on social media to reach more people who need great recommendations.".to_string()
        };
        (
            format!(
                "Impressive! {} recommendations - you're a true {}!",
                s.recommendations, level
            ),
            suggestion,
        )
    };

    let milestone = match s.recommendations {
        1 => "🎉 First recommendation posted! You're officially a curator now.".to_string(),
        5 => "🌟 5 recommendations! You're building a solid foundation.".to_string(),
        10 => "🔥 Double digits! 10 recommendations is a serious achievement.".to_string(),
        25 => "⭐ 25 recommendations! People are going to love browsing your lists.".to_string(),
        50 => "🚀 50 recommendations! You've built something truly special.".to_string(),
        100 => "👑 100 recommendations! You're in the curator hall of fame.".to_string(),
        _ if s.followers == 5 => {
            "👥 5 followers! Your recommendations are resonating with people.".to_string()
        }
        _ if s.followers == 10 => format!(
            "🎯 {} followers! You're becoming an influencer in your niches.",
            s.followers
        ),
        _ if s.followers >= 25 => format!(
            "🌟 {} followers! You're definitely making an impact.",
            s.followers
        ),
        _ if s.likes >= 20 => format!(
            "❤️ {} total likes! People really appreciate your recommendations.",
            s.likes
        ),
        _ if s.recent >= 3 => format!(
            "🔥 {} new recommendations this week! You're on fire.",
            s.recent
        ),
        _ => String::new(),
    };

    let weekend = matches!(now.weekday(), Weekday::Sat | Weekday::Sun);
    if weekend && now.hour() >= 10 {
        suggestion.push_str(if s.recent == 0 {
            " Perfect weekend time to add some new discoveries!"
        } else {
            " Great weekend for curating!"
        });
    }

    WelcomeMessage {
        greeting,
        activity,
        suggestion,
        milestone,
    }
}
