use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::models::{CostTier, Recommendation};
use crate::tags::Tags;

/// Validated recommendation fields from the dashboard form.
#[derive(Debug, Clone)]
pub struct RecommendationInput {
    pub category_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub pro_tip: Option<String>,
    pub url: Option<String>,
    pub rating: u8,
    pub cost_rating: CostTier,
    pub location: Option<String>,
    pub tags: Tags,
}

/// A recommendation with the category and profile it is listed under.
#[derive(Debug, Clone)]
pub struct Listing {
    pub rec: Recommendation,
    pub category_name: String,
    pub category_slug: String,
    pub profile_id: i64,
    pub profile_name: String,
    pub profile_slug: String,
    pub like_count: i64,
}

impl Listing {
    pub fn href(&self) -> String {
        format!(
            "/p/{}/{}/{}",
            self.profile_slug, self.category_slug, self.rec.id
        )
    }
}

const LISTING_FROM: &str = "FROM recommendations r \
     JOIN categories c ON c.id = r.category_id \
     JOIN profiles p ON p.id = c.profile_id";

/// Public profiles, plus the viewer's own.
const VISIBLE: &str = "(p.is_public = 1 OR p.user_id = ?1)";

/// Element membership of a slug in either tag list.
const HAS_TAG: &str = "(EXISTS (SELECT 1 FROM json_each(r.tags, '$.categories') WHERE value = ?{n}) \
     OR EXISTS (SELECT 1 FROM json_each(r.tags, '$.collections') WHERE value = ?{n}))";

fn listing_select() -> String {
    format!(
        "SELECT {}, c.name, c.slug, p.id, p.name, p.slug, \
         (SELECT COUNT(*) FROM likes l WHERE l.recommendation_id = r.id) AS like_count {}",
        Recommendation::COLUMNS,
        LISTING_FROM
    )
}

fn listing_from_row(row: &rusqlite::Row) -> rusqlite::Result<Listing> {
    let w = Recommendation::WIDTH;
    Ok(Listing {
        rec: Recommendation::from_row(row)?,
        category_name: row.get(w)?,
        category_slug: row.get(w + 1)?,
        profile_id: row.get(w + 2)?,
        profile_name: row.get(w + 3)?,
        profile_slug: row.get(w + 4)?,
        like_count: row.get(w + 5)?,
    })
}

fn query_listings(
    conn: &Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> rusqlite::Result<Vec<Listing>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, listing_from_row)?;
    rows.collect()
}

pub fn create(
    conn: &Connection,
    input: &RecommendationInput,
    image: Option<&str>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO recommendations (category_id, title, description, pro_tip, url, image, \
         rating, cost_rating, location, tags) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            input.category_id,
            input.title,
            input.description,
            input.pro_tip,
            input.url,
            image,
            input.rating,
            input.cost_rating,
            input.location,
            input.tags,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Update in place; the image only changes when a new one was uploaded.
pub fn update(
    conn: &Connection,
    id: i64,
    input: &RecommendationInput,
    image: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE recommendations SET category_id = ?2, title = ?3, description = ?4, \
         pro_tip = ?5, url = ?6, image = COALESCE(?7, image), rating = ?8, \
         cost_rating = ?9, location = ?10, tags = ?11, updated_at = datetime('now') \
         WHERE id = ?1",
        params![
            id,
            input.category_id,
            input.title,
            input.description,
            input.pro_tip,
            input.url,
            image,
            input.rating,
            input.cost_rating,
            input.location,
            input.tags,
        ],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM recommendations WHERE id = ?1", params![id])? > 0)
}

pub fn save_tags(conn: &Connection, id: i64, tags: &Tags) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE recommendations SET tags = ?2, updated_at = datetime('now') WHERE id = ?1",
        params![id, tags],
    )?;
    Ok(())
}

pub fn find(conn: &Connection, id: i64) -> rusqlite::Result<Option<Recommendation>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM recommendations r WHERE r.id = ?1",
            Recommendation::COLUMNS
        ),
        params![id],
        Recommendation::from_row,
    )
    .optional()
}

/// A recommendation only if it sits in one of `profile_id`'s categories.
pub fn find_owned(
    conn: &Connection,
    id: i64,
    profile_id: i64,
) -> rusqlite::Result<Option<Recommendation>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM recommendations r JOIN categories c ON c.id = r.category_id \
             WHERE r.id = ?1 AND c.profile_id = ?2",
            Recommendation::COLUMNS
        ),
        params![id, profile_id],
        Recommendation::from_row,
    )
    .optional()
}

pub fn find_in_category(
    conn: &Connection,
    id: i64,
    category_id: i64,
) -> rusqlite::Result<Option<Recommendation>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM recommendations r WHERE r.id = ?1 AND r.category_id = ?2",
            Recommendation::COLUMNS
        ),
        params![id, category_id],
        Recommendation::from_row,
    )
    .optional()
}

/// User id of the profile that owns a recommendation.
pub fn owner_user_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT p.user_id FROM recommendations r \
         JOIN categories c ON c.id = r.category_id \
         JOIN profiles p ON p.id = c.profile_id WHERE r.id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()
}

/// All of a profile's recommendations, newest first.
pub fn list_for_profile(conn: &Connection, profile_id: i64) -> rusqlite::Result<Vec<Listing>> {
    query_listings(
        conn,
        &format!(
            "{} WHERE p.id = ?1 ORDER BY r.created_at DESC, r.id DESC",
            listing_select()
        ),
        params![profile_id],
    )
}

pub fn recent_for_profile(
    conn: &Connection,
    profile_id: i64,
    limit: i64,
) -> rusqlite::Result<Vec<Listing>> {
    query_listings(
        conn,
        &format!(
            "{} WHERE p.id = ?1 ORDER BY r.created_at DESC, r.id DESC LIMIT ?2",
            listing_select()
        ),
        params![profile_id, limit],
    )
}

pub fn list_for_category(conn: &Connection, category_id: i64) -> rusqlite::Result<Vec<Listing>> {
    query_listings(
        conn,
        &format!(
            "{} WHERE c.id = ?1 ORDER BY r.created_at DESC, r.id DESC",
            listing_select()
        ),
        params![category_id],
    )
}

/// Newest recommendations across public profiles.
pub fn recent_public(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<Listing>> {
    query_listings(
        conn,
        &format!(
            "{} WHERE p.is_public = 1 ORDER BY r.created_at DESC, r.id DESC LIMIT ?1",
            listing_select()
        ),
        params![limit],
    )
}

/// Most-liked public recommendations with a pro tip, preferring this month's;
/// falls back to all time when this month has fewer than `limit`.
pub fn popular_pro_tips(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<Listing>> {
    let sql = |extra: &str| {
        format!(
            "{} WHERE p.is_public = 1 AND r.pro_tip IS NOT NULL AND r.pro_tip != '' {} \
             ORDER BY like_count DESC, r.created_at DESC, r.id DESC LIMIT ?1",
            listing_select(),
            extra
        )
    };

    let this_month = query_listings(
        conn,
        &sql("AND r.created_at >= datetime('now', 'start of month')"),
        params![limit],
    )?;
    if this_month.len() as i64 >= limit {
        return Ok(this_month);
    }
    query_listings(conn, &sql(""), params![limit])
}

/// Visible recommendations carrying every tag in `tags`, newest first.
pub fn search_by_tags(
    conn: &Connection,
    tags: &[String],
    viewer_id: Option<i64>,
    limit: i64,
) -> rusqlite::Result<Vec<Listing>> {
    let mut values: Vec<Value> = vec![Value::Integer(viewer_id.unwrap_or(-1))];
    let mut filters = vec![VISIBLE.to_string()];
    for tag in tags {
        values.push(Value::Text(tag.clone()));
        filters.push(HAS_TAG.replace("{n}", &values.len().to_string()));
    }
    values.push(Value::Integer(limit));

    let sql = format!(
        "{} WHERE {} ORDER BY r.created_at DESC, r.id DESC LIMIT ?{}",
        listing_select(),
        filters.join(" AND "),
        values.len()
    );
    query_listings(conn, &sql, params_from_iter(values.iter()))
}

/// Distinct tags of one list, sorted, over recommendations matching `scope`.
fn distinct_tags(
    conn: &Connection,
    list: &str,
    scope: &str,
    owner: i64,
) -> rusqlite::Result<Vec<String>> {
    let sql = format!(
        "SELECT DISTINCT t.value {}, json_each(r.tags, '$.{}') t \
         WHERE {} AND t.type = 'text' ORDER BY t.value",
        LISTING_FROM, list, scope
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner], |row| row.get(0))?;
    rows.collect()
}

/// Every tag in use on recommendations the viewer may see.
pub fn visible_tags(conn: &Connection, viewer_id: Option<i64>) -> rusqlite::Result<Tags> {
    let viewer = viewer_id.unwrap_or(-1);
    Ok(Tags {
        categories: distinct_tags(conn, "categories", VISIBLE, viewer)?,
        collections: distinct_tags(conn, "collections", VISIBLE, viewer)?,
    })
}

/// Collection tags on the user's own recommendations.
pub fn own_collections(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<String>> {
    distinct_tags(conn, "collections", "p.user_id = ?1", user_id)
}

#[cfg(test)]
pub(crate) fn insert_simple(
    conn: &Connection,
    category_id: i64,
    title: &str,
    tags: Tags,
) -> i64 {
    create(
        conn,
        &RecommendationInput {
            category_id,
            title: title.to_string(),
            description: None,
            pro_tip: None,
            url: None,
            rating: 4,
            cost_rating: CostTier::Moderate,
            location: None,
            tags,
        },
        None,
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{categories, profiles, social, test_pool, users};

    struct Fixture {
        user_id: i64,
        profile_id: i64,
        food_id: i64,
    }

    fn fixture(conn: &Connection, username: &str) -> Fixture {
        let user_id = users::insert_verified(conn, username);
        let profile = profiles::insert_for(conn, user_id, username);
        let food = categories::find_by_slug(conn, profile.id, "food")
            .unwrap()
            .unwrap();
        Fixture {
            user_id,
            profile_id: profile.id,
            food_id: food.id,
        }
    }

    fn titles(listings: &[Listing]) -> Vec<&str> {
        listings.iter().map(|l| l.rec.title.as_str()).collect()
    }

    #[test]
    fn create_and_update_keep_image_unless_replaced() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let f = fixture(&conn, "ana");

        let mut input = RecommendationInput {
            category_id: f.food_id,
            title: "Tacos".into(),
            description: Some("Great".into()),
            pro_tip: Some("Go early".into()),
            url: Some("https://tacos.example".into()),
            rating: 5,
            cost_rating: CostTier::Budget,
            location: Some("Sayulita".into()),
            tags: Tags::from_form("food", "mexico"),
        };
        let id = create(&conn, &input, Some("data:image/png;base64,AAAA")).unwrap();

        input.title = "Tacos al Pastor".into();
        input.rating = 4;
        update(&conn, id, &input, None).unwrap();

        let rec = find_owned(&conn, id, f.profile_id).unwrap().unwrap();
        assert_eq!(rec.title, "Tacos al Pastor");
        assert_eq!(rec.rating, 4);
        assert_eq!(rec.cost_rating, CostTier::Budget);
        assert_eq!(rec.image.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(rec.tags.collections, vec!["mexico"]);
        assert_eq!(owner_user_id(&conn, id).unwrap(), Some(f.user_id));
    }

    #[test]
    fn rating_outside_range_is_rejected_by_schema() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let f = fixture(&conn, "ana");
        let result = conn.execute(
            "INSERT INTO recommendations (category_id, title, rating, cost_rating) \
             VALUES (?1, 'Bad', 6, '$')",
            params![f.food_id],
        );
        assert!(result.is_err());
    }

    #[test]
    fn ownership_is_scoped_to_profile() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let ana = fixture(&conn, "ana");
        let ben = fixture(&conn, "ben");
        let id = insert_simple(&conn, ana.food_id, "Tacos", Tags::default());

        assert!(find_owned(&conn, id, ana.profile_id).unwrap().is_some());
        assert!(find_owned(&conn, id, ben.profile_id).unwrap().is_none());
        assert!(find_in_category(&conn, id, ben.food_id).unwrap().is_none());
    }

    #[test]
    fn deleting_category_cascades_to_recommendations_likes_and_comments() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let f = fixture(&conn, "ana");
        let id = insert_simple(&conn, f.food_id, "Tacos", Tags::default());
        conn.execute(
            "INSERT INTO likes (user_id, recommendation_id) VALUES (?1, ?2)",
            params![f.user_id, id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO comments (content, user_id, recommendation_id) VALUES ('yum', ?1, ?2)",
            params![f.user_id, id],
        )
        .unwrap();

        categories::delete(&conn, f.food_id).unwrap();

        assert!(find(&conn, id).unwrap().is_none());
        let leftovers: i64 = conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM likes) + (SELECT COUNT(*) FROM comments)",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn deleting_recommendation_removes_its_likes_and_comments() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let f = fixture(&conn, "ana");
        let kept = insert_simple(&conn, f.food_id, "Churros", Tags::default());
        let id = insert_simple(&conn, f.food_id, "Tacos", Tags::default());
        for rec in [kept, id] {
            social::toggle_like(&conn, f.user_id, rec).unwrap();
            social::add_comment(&conn, f.user_id, rec, "yum").unwrap();
        }

        assert!(delete(&conn, id).unwrap());

        assert!(find(&conn, id).unwrap().is_none());
        assert_eq!(social::like_count(&conn, id).unwrap(), 0);
        assert!(social::comments_for(&conn, id).unwrap().is_empty());
        assert_eq!(social::like_count(&conn, kept).unwrap(), 1);
        assert_eq!(social::comments_for(&conn, kept).unwrap().len(), 1);
    }

    #[test]
    fn tag_filter_matches_whole_elements_only() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let f = fixture(&conn, "ana");
        insert_simple(&conn, f.food_id, "Gallery", Tags::from_form("smart-art", ""));
        insert_simple(&conn, f.food_id, "Museum", Tags::from_form("", "art"));

        let found = search_by_tags(&conn, &["art".to_string()], None, 50).unwrap();
        assert_eq!(titles(&found), vec!["Museum"]);
    }

    #[test]
    fn tag_filter_ands_multiple_tags_across_lists() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let f = fixture(&conn, "ana");
        insert_simple(&conn, f.food_id, "Both", Tags::from_form("food", "sayulita"));
        insert_simple(&conn, f.food_id, "Food only", Tags::from_form("food", ""));

        let tags = vec!["food".to_string(), "sayulita".to_string()];
        assert_eq!(titles(&search_by_tags(&conn, &tags, None, 50).unwrap()), vec!["Both"]);

        let all = search_by_tags(&conn, &[], None, 50).unwrap();
        assert_eq!(titles(&all), vec!["Food only", "Both"]);
    }

    #[test]
    fn private_profiles_only_visible_to_owner() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let f = fixture(&conn, "ana");
        insert_simple(&conn, f.food_id, "Secret", Tags::from_form("food", "hidden"));
        conn.execute(
            "UPDATE profiles SET is_public = 0 WHERE id = ?1",
            params![f.profile_id],
        )
        .unwrap();

        let food = vec!["food".to_string()];
        assert!(search_by_tags(&conn, &food, None, 50).unwrap().is_empty());
        assert_eq!(search_by_tags(&conn, &food, Some(f.user_id), 50).unwrap().len(), 1);
        assert!(visible_tags(&conn, None).unwrap().is_empty());
        assert_eq!(
            visible_tags(&conn, Some(f.user_id)).unwrap().collections,
            vec!["hidden"]
        );
        assert!(recent_public(&conn, 8).unwrap().is_empty());
    }

    #[test]
    fn visible_tags_are_distinct_and_sorted() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let ana = fixture(&conn, "ana");
        let ben = fixture(&conn, "ben");
        insert_simple(&conn, ana.food_id, "A", Tags::from_form("food, coffee", "summer"));
        insert_simple(&conn, ben.food_id, "B", Tags::from_form("food", "autumn"));

        let tags = visible_tags(&conn, None).unwrap();
        assert_eq!(tags.categories, vec!["coffee", "food"]);
        assert_eq!(tags.collections, vec!["autumn", "summer"]);
        assert_eq!(own_collections(&conn, ben.user_id).unwrap(), vec!["autumn"]);
    }

    #[test]
    fn popular_pro_tips_rank_by_likes() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let f = fixture(&conn, "ana");
        let fan = users::insert_verified(&conn, "fan");
        let mut ids = Vec::new();
        for title in ["One", "Two", "Three"] {
            let id = insert_simple(&conn, f.food_id, title, Tags::default());
            conn.execute(
                "UPDATE recommendations SET pro_tip = 'tip' WHERE id = ?1",
                params![id],
            )
            .unwrap();
            ids.push(id);
        }
        insert_simple(&conn, f.food_id, "No tip", Tags::default());
        for user in [f.user_id, fan] {
            conn.execute(
                "INSERT INTO likes (user_id, recommendation_id) VALUES (?1, ?2)",
                params![user, ids[1]],
            )
            .unwrap();
        }

        let tips = popular_pro_tips(&conn, 4).unwrap();
        assert_eq!(titles(&tips), vec!["Two", "Three", "One"]);
        assert_eq!(tips[0].like_count, 2);
        assert_eq!(tips[0].href(), format!("/p/ana/food/{}", ids[1]));
    }
}
